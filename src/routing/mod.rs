//! The `routing` module turns one telemetry snapshot into the ordered set of
//! messages a vehicle publishes each cycle.

pub mod message;
pub mod table;

pub use message::{RoutedMessage, build_routes, encode_payload};
pub use table::{FanOutTable, RouteSpec, TopicTemplate, View};
