//! Blocking client for the room-management service.

use super::types::{ApiResponse, CreateRoom, Room, RoomError, RoomFilters, RoomUpdate, RoomsPage};
use crate::config::Settings;
use crate::session::TokenStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// A file to send as one part of an image upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ImagePart {
    pub fn from_path(path: &Path) -> Result<Self, RoomError> {
        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".into());
        Ok(Self {
            content_type: content_type_for(&file_name),
            file_name,
            bytes,
        })
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Encode `image_0 .. image_n` as a `multipart/form-data` body.
fn multipart_body(boundary: &str, parts: &[ImagePart]) -> Vec<u8> {
    let mut body = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"image_{}\"; filename=\"{}\"\r\n",
                i,
                part.file_name.replace('"', "")
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes());
        body.extend_from_slice(&part.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}

/// Room-service client. Attaches the stored bearer token when one exists.
pub struct RoomClient {
    agent: ureq::Agent,
    base_url: String,
    session: TokenStore,
}

impl RoomClient {
    pub fn new(base_url: impl Into<String>, session: TokenStore, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.rooms_base_url.clone(),
            TokenStore::load_from(settings.token_path.clone()),
            settings.http_timeout,
        )
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{}", self.base_url, path);
        debug!(method, path, "room API request");
        let request = self.agent.request(method, &url);
        match self.session.token() {
            Some(token) => request.set("Authorization", &format!("Bearer {}", token)),
            None => request,
        }
    }

    fn send_json<T, B>(&self, request: ureq::Request, body: Option<&B>) -> Result<ApiResponse<T>, RoomError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = request.set("Content-Type", "application/json");
        let result = match body {
            Some(b) => {
                let value = serde_json::to_value(b).map_err(|e| RoomError::InvalidResponse(e.to_string()))?;
                request.send_json(value)
            }
            None => request.call(),
        };
        decode(result)
    }

    pub fn create_room(&self, room: &CreateRoom) -> Result<Room, RoomError> {
        let response = self.send_json(self.request("POST", "/rooms"), Some(room))?;
        required(response, "failed to create room")
    }

    pub fn list_rooms(&self, filters: &RoomFilters, page: u32, limit: u32) -> Result<RoomsPage, RoomError> {
        let mut request = self.request("GET", "/rooms");
        for (key, value) in filters.to_query(page, limit) {
            request = request.query(key, &value);
        }
        let response = self.send_json::<_, ()>(request, None)?;
        required(response, "failed to fetch rooms")
    }

    pub fn get_room(&self, id: &str) -> Result<Room, RoomError> {
        let path = format!("/rooms/{}", encode_id(id));
        let response = self.send_json::<_, ()>(self.request("GET", &path), None)?;
        required(response, "failed to fetch room")
    }

    pub fn update_room(&self, id: &str, update: &RoomUpdate) -> Result<Room, RoomError> {
        let path = format!("/rooms/{}", encode_id(id));
        let response = self.send_json(self.request("PUT", &path), Some(update))?;
        required(response, "failed to update room")
    }

    pub fn delete_room(&self, id: &str) -> Result<bool, RoomError> {
        let path = format!("/rooms/{}", encode_id(id));
        let response: ApiResponse<serde_json::Value> =
            self.send_json::<_, ()>(self.request("DELETE", &path), None)?;
        response.into_data("failed to delete room")?;
        Ok(true)
    }

    pub fn user_rooms(&self, user_id: &str) -> Result<Vec<Room>, RoomError> {
        let path = format!("/users/{}/rooms", encode_id(user_id));
        let response = self.send_json::<_, ()>(self.request("GET", &path), None)?;
        required(response, "failed to fetch user rooms")
    }

    /// Upload images for a room; returns the stored image URLs.
    pub fn upload_images(&self, room_id: &str, parts: &[ImagePart]) -> Result<Vec<String>, RoomError> {
        if parts.is_empty() {
            return Ok(Vec::new());
        }
        let boundary = format!("roomhub-{:x}", chrono::Utc::now().timestamp_micros());
        let body = multipart_body(&boundary, parts);
        let path = format!("/rooms/{}/images", encode_id(room_id));

        let result = self
            .request("POST", &path)
            .set("Content-Type", &format!("multipart/form-data; boundary={}", boundary))
            .send_bytes(&body);
        required(decode(result)?, "failed to upload images")
    }
}

fn encode_id(id: &str) -> String {
    crate::address::provider::encode_component(id)
}

fn decode<T: DeserializeOwned>(result: Result<ureq::Response, ureq::Error>) -> Result<ApiResponse<T>, RoomError> {
    let response = match result {
        Ok(r) => r,
        Err(ureq::Error::Status(code, response)) => {
            // The service still wraps most failures in its envelope.
            let mut text = String::new();
            if let Err(e) = response.into_reader().take(64 * 1024).read_to_string(&mut text) {
                debug!(status = code, error = %e, "could not read room API error body");
            }
            if let Ok(envelope) = serde_json::from_str::<ApiResponse<T>>(&text) {
                if !envelope.success {
                    return Ok(envelope);
                }
            }
            warn!(status = code, "room API returned an error status");
            return Err(RoomError::Status(code));
        }
        Err(ureq::Error::Transport(t)) => return Err(RoomError::Network(t.to_string())),
    };

    response
        .into_json()
        .map_err(|e| RoomError::InvalidResponse(e.to_string()))
}

fn required<T>(response: ApiResponse<T>, default_error: &str) -> Result<T, RoomError> {
    response.into_data(default_error)?.ok_or(RoomError::MissingData)
}
