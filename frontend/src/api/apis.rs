use super::{
    client::{path_segment, to_payload, ApiClient},
    error::ApiError,
    types::{ApiRecord, CreateApiRequest, GetApisParams, Page, UpdateApiRequest},
};

const APIS_PATH: &str = "/api/v1/apis";

impl ApiClient {
    pub async fn list_apis(&self, params: &GetApisParams) -> Result<Page<ApiRecord>, ApiError> {
        let query = to_payload(params)?;
        self.get_page(APIS_PATH, Some(&query)).await
    }

    pub async fn get_api(&self, id: &str) -> Result<ApiRecord, ApiError> {
        self.get(&format!("{}/{}", APIS_PATH, path_segment(id)), None)
            .await
    }

    pub async fn create_api(&self, request: &CreateApiRequest) -> Result<ApiRecord, ApiError> {
        self.post(APIS_PATH, request).await
    }

    pub async fn update_api(&self, id: &str, request: &UpdateApiRequest) -> Result<ApiRecord, ApiError> {
        let payload = UpdateApiRequest {
            id: id.to_string(),
            ..request.clone()
        };
        self.put(&format!("{}/{}", APIS_PATH, path_segment(id)), &payload)
            .await
    }

    pub async fn delete_api(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/{}", APIS_PATH, path_segment(id)))
            .await
    }
}
