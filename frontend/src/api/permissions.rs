use super::{
    client::{path_segment, to_payload, ApiClient},
    error::ApiError,
    types::{
        AssignPermissionApiRequest, CreatePermissionRequest, GetPermissionsParams, Page,
        PermissionRecord, UpdatePermissionRequest,
    },
};

const PERMISSIONS_PATH: &str = "/api/v1/permissions";

impl ApiClient {
    pub async fn list_permissions(
        &self,
        params: &GetPermissionsParams,
    ) -> Result<Page<PermissionRecord>, ApiError> {
        let query = to_payload(params)?;
        self.get_page(PERMISSIONS_PATH, Some(&query)).await
    }

    pub async fn get_permission(&self, id: &str) -> Result<PermissionRecord, ApiError> {
        self.get(&format!("{}/{}", PERMISSIONS_PATH, path_segment(id)), None)
            .await
    }

    pub async fn create_permission(
        &self,
        request: &CreatePermissionRequest,
    ) -> Result<PermissionRecord, ApiError> {
        self.post(PERMISSIONS_PATH, request).await
    }

    pub async fn update_permission(
        &self,
        id: &str,
        request: &UpdatePermissionRequest,
    ) -> Result<PermissionRecord, ApiError> {
        let payload = UpdatePermissionRequest {
            id: id.to_string(),
            ..request.clone()
        };
        self.put(&format!("{}/{}", PERMISSIONS_PATH, path_segment(id)), &payload)
            .await
    }

    pub async fn delete_permission(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/{}", PERMISSIONS_PATH, path_segment(id)))
            .await
    }

    pub async fn assign_permission_apis(
        &self,
        id: &str,
        api_ids: Vec<String>,
    ) -> Result<(), ApiError> {
        let payload = AssignPermissionApiRequest {
            permission_id: id.to_string(),
            api_ids,
        };
        self.post_void(&format!("{}/{}/apis", PERMISSIONS_PATH, path_segment(id)), &payload)
            .await
    }
}
