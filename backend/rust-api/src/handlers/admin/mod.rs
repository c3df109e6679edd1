mod results;
mod students;
mod test_sets;

pub use results::*;
pub use students::*;
pub use test_sets::*;

use axum::extract::Multipart;
use std::collections::HashMap;

use crate::error::ApiError;

/// Uploaded file plus the text fields sent next to it
pub(crate) struct UploadForm {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub fields: HashMap<String, String>,
}

/// Buffers a multipart upload. The part named `file` carries the sheet;
/// every other named part is read as text.
pub(crate) async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut file = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();

        if field_name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            file = Some((file_name, bytes.to_vec()));
        } else if !field_name.is_empty() {
            fields.insert(field_name, field.text().await?);
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("File part \"file\" is required".to_string()))?;

    tracing::debug!(file_name = %file_name, size = bytes.len(), "Upload received");
    Ok(UploadForm {
        file_name,
        bytes,
        fields,
    })
}
