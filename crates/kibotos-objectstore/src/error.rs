use kibotos_types::KibotosError;

#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("object store error: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("invalid credentials: {0}")]
    Credentials(#[from] s3::creds::error::CredentialsError),
}

impl From<ObjectStoreError> for KibotosError {
    fn from(err: ObjectStoreError) -> Self {
        KibotosError::Internal(err.to_string())
    }
}
