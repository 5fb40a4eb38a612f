use super::{
    client::{path_segment, to_payload, ApiClient},
    error::ApiError,
    types::{AssignUserRoleRequest, CreateUserRequest, GetUsersParams, Page, UpdateUserRequest, UserRecord},
};

const USERS_PATH: &str = "/api/v1/users";

impl ApiClient {
    pub async fn list_users(&self, params: &GetUsersParams) -> Result<Page<UserRecord>, ApiError> {
        let query = to_payload(params)?;
        self.get_page(USERS_PATH, Some(&query)).await
    }

    pub async fn get_user(&self, id: &str) -> Result<UserRecord, ApiError> {
        self.get(&format!("{}/{}", USERS_PATH, path_segment(id)), None)
            .await
    }

    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<UserRecord, ApiError> {
        self.post(USERS_PATH, request).await
    }

    pub async fn update_user(
        &self,
        id: &str,
        request: &UpdateUserRequest,
    ) -> Result<UserRecord, ApiError> {
        let payload = UpdateUserRequest {
            id: id.to_string(),
            ..request.clone()
        };
        self.put(&format!("{}/{}", USERS_PATH, path_segment(id)), &payload)
            .await
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/{}", USERS_PATH, path_segment(id)))
            .await
    }

    pub async fn assign_user_roles(
        &self,
        id: &str,
        request: &AssignUserRoleRequest,
    ) -> Result<(), ApiError> {
        self.post_void(&format!("{}/{}/roles", USERS_PATH, path_segment(id)), request)
            .await
    }
}
