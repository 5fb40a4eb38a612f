use super::{
    client::{path_segment, to_payload, ApiClient},
    error::ApiError,
    types::{
        AssignRolePermissionRequest, CreateRoleRequest, GetRolesParams, Page, RoleRecord,
        UpdateRoleRequest,
    },
};

const ROLES_PATH: &str = "/api/v1/roles";

impl ApiClient {
    pub async fn list_roles(&self, params: &GetRolesParams) -> Result<Page<RoleRecord>, ApiError> {
        let query = to_payload(params)?;
        self.get_page(ROLES_PATH, Some(&query)).await
    }

    pub async fn get_role(&self, id: &str) -> Result<RoleRecord, ApiError> {
        self.get(&format!("{}/{}", ROLES_PATH, path_segment(id)), None)
            .await
    }

    pub async fn create_role(&self, request: &CreateRoleRequest) -> Result<RoleRecord, ApiError> {
        self.post(ROLES_PATH, request).await
    }

    pub async fn update_role(
        &self,
        id: &str,
        request: &UpdateRoleRequest,
    ) -> Result<RoleRecord, ApiError> {
        let payload = UpdateRoleRequest {
            id: id.to_string(),
            ..request.clone()
        };
        self.put(&format!("{}/{}", ROLES_PATH, path_segment(id)), &payload)
            .await
    }

    pub async fn delete_role(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/{}", ROLES_PATH, path_segment(id)))
            .await
    }

    /// The role id in the body always matches the path.
    pub async fn assign_role_permissions(
        &self,
        id: &str,
        permission_ids: Vec<String>,
    ) -> Result<(), ApiError> {
        let payload = AssignRolePermissionRequest {
            role_id: id.to_string(),
            permission_ids,
        };
        self.post_void(&format!("{}/{}/permissions", ROLES_PATH, path_segment(id)), &payload)
            .await
    }
}
