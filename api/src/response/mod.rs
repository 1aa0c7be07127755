use serde::Serialize;

/// Uniform JSON envelope for every API response.
///
/// Every endpoint answers with the same three fields, success or not:
/// ```json
/// { "success": true, "data": { ... }, "message": "Attendance recorded" }
/// ```
/// Clients and the scanner kit branch on `success` and read machine
/// decisions out of `data`; `message` is for people.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: T,
    pub message: String,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// Constructs a success response with the given data and message.
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
        }
    }

    /// Constructs an error response carrying `T::default()` as data.
    pub fn error(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            data: T::default(),
            message: message.into(),
        }
    }

    /// Constructs a failure response that still carries a typed payload.
    ///
    /// Check-in rejections use this: `data` holds the machine-readable
    /// rejection code while `message` stays human-readable.
    pub fn failure(data: T, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            message: message.into(),
        }
    }
}
