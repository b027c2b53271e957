use serde::{Deserialize, Serialize};

/// Response envelope used by every MemeToMoney backend:
/// `{"status": 200, "message": "...", "data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// 2xx status, regardless of payload.
    pub fn is_ok_status(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 2xx status with a payload present.
    pub fn is_success(&self) -> bool {
        self.is_ok_status() && self.data.is_some()
    }
}

/// Page request parameters (zero-based page index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_size() -> u32 {
    10
}

impl PageParams {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    /// First page with the given size.
    pub fn first(size: u32) -> Self {
        Self { page: 0, size }
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self::first(default_size())
    }
}

/// Spring-style page wrapper returned by paginated endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub first: bool,
    #[serde(default)]
    pub last: bool,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub number_of_elements: u32,
    #[serde(default)]
    pub empty: bool,
}

impl<T> PageResponse<T> {
    /// A single page holding `items`, flagged as last or not.
    pub fn of(items: Vec<T>, number: u32, last: bool) -> Self {
        let n = items.len() as u32;
        Self {
            empty: items.is_empty(),
            content: items,
            total_pages: if last { number + 1 } else { number + 2 },
            total_elements: 0,
            first: number == 0,
            last,
            size: n,
            number,
            number_of_elements: n,
        }
    }
}

/// Get the current time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
