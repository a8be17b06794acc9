//! Upstream timeouts shared by routes, services and upstreams

use apisix_schema::validator::int_at_least;
use apisix_schema::{attributes, Attribute};
use serde::{Deserialize, Serialize};

/// Connect, send and read timeouts in seconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeoutModel {
    /// Time to establish a connection
    pub connect: i64,
    /// Time to send a request
    pub send: i64,
    /// Time to read a response
    pub read: i64,
}

/// `timeout` attribute
pub fn timeout_attribute() -> Attribute {
    Attribute::single_nested(attributes([
        (
            "connect",
            Attribute::int64()
                .required()
                .validator(int_at_least(1))
                .description("Connection timeout in seconds."),
        ),
        (
            "send",
            Attribute::int64()
                .required()
                .validator(int_at_least(1))
                .description("Send timeout in seconds."),
        ),
        (
            "read",
            Attribute::int64()
                .required()
                .validator(int_at_least(1))
                .description("Read timeout in seconds."),
        ),
    ]))
    .optional()
    .description("Timeouts for connecting to, sending to and reading from the upstream.")
}
