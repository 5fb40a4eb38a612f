use serde_json::{json, Value};

pub fn flag_ok(data: Value) -> Value {
    json!({"success": true, "data": data})
}

pub fn flag_err(code: &str, message: &str) -> Value {
    json!({"success": false, "errCode": code, "errMessage": message})
}

pub fn code_ok(data: Value) -> Value {
    json!({"code": 200, "message": "ok", "data": data})
}

pub fn code_err(code: i64, message: &str) -> Value {
    json!({"code": code, "message": message, "data": null})
}

pub fn user_json(id: &str, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "email": format!("{}@yggdrasil-labs.com", username),
        "avatar": null,
        "roles": ["member"],
        "permissions": ["system:users:read"],
        "createdAt": "2025-01-02T10:00:00Z",
        "updatedAt": "2025-01-02T10:00:00Z"
    })
}

pub fn role_json(id: &str, code: &str) -> Value {
    json!({
        "id": id,
        "roleCode": code,
        "roleName": code.to_uppercase(),
        "isSystem": false,
        "permissionIds": []
    })
}
