//! JSON bodies exchanged with the open API.
//!
//! Field names are fixed by the service and must not change.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Endpoint paths, relative to the configured base URL.
pub mod paths {
    pub const ACCESS_TOKEN: &str = "/api/v1/access_token";
    pub const CREATE_FILE: &str = "/upload/v1/file/create";
    pub const GET_UPLOAD_URL: &str = "/upload/v1/file/get_upload_url";
    pub const LIST_UPLOAD_PARTS: &str = "/upload/v1/file/list_upload_parts";
    pub const UPLOAD_COMPLETE: &str = "/upload/v1/file/upload_complete";
    pub const UPLOAD_ASYNC_RESULT: &str = "/upload/v1/file/upload_async_result";
}

/// Response wrapper shared by every API call.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub code:     i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message:  String,
    #[serde(default)]
    pub data:     serde_json::Value,
    #[serde(rename = "x-traceID", default)]
    pub trace_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenRequest<'a> {
    #[serde(rename = "clientID")]
    pub client_id:     &'a str,
    #[serde(rename = "clientSecret")]
    pub client_secret: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "expiredAt", default, deserialize_with = "null_as_default")]
    pub expired_at:   String,
}

#[derive(Debug, Serialize)]
pub struct CreateFileRequest<'a> {
    #[serde(rename = "parentFileID")]
    pub parent_file_id: u64,
    pub filename:       &'a str,
    /// Hex-encoded content digest.
    pub etag:           String,
    pub size:           u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateFileResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub reuse:        bool,
    #[serde(rename = "fileID", default, deserialize_with = "null_as_default")]
    pub file_id:      u64,
    #[serde(rename = "preuploadID", default, deserialize_with = "null_as_default")]
    pub preupload_id: String,
    #[serde(rename = "sliceSize", default, deserialize_with = "null_as_default")]
    pub slice_size:   u64,
}

/// Body of every call that only names the pre-upload session.
#[derive(Debug, Serialize)]
pub struct PreuploadRequest<'a> {
    #[serde(rename = "preuploadID")]
    pub preupload_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UploadUrlRequest<'a> {
    #[serde(rename = "preuploadID")]
    pub preupload_id: &'a str,
    #[serde(rename = "sliceNo")]
    pub slice_no:     u32,
}

#[derive(Debug, Deserialize)]
pub struct UploadUrlResponse {
    #[serde(rename = "presignedURL")]
    pub presigned_url: String,
}

#[derive(Debug, Deserialize)]
pub struct ListPartsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub parts: Vec<UploadedPart>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct UploadedPart {
    #[serde(rename = "partNumber", deserialize_with = "lenient_u32")]
    pub part_number: u32,
    #[serde(deserialize_with = "lenient_u64")]
    pub size:        u64,
}

#[derive(Debug, Deserialize)]
pub struct CompleteResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
    #[serde(rename = "async", default, deserialize_with = "null_as_default")]
    pub is_async:  bool,
    #[serde(rename = "fileID", default, deserialize_with = "null_as_default")]
    pub file_id:   u64,
}

#[derive(Debug, Deserialize)]
pub struct AsyncResultResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
    #[serde(rename = "fileID", default, deserialize_with = "null_as_default")]
    pub file_id:   u64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let n = lenient_u64(deserializer)?;
    u32::try_from(n).map_err(de::Error::custom)
}
