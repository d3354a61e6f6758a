pub mod ids;
pub mod record;
pub mod request;
pub mod response;
pub mod version;

pub use ids::{NodeId, RequestId, ResponseId};
pub use record::{FieldSet, Record};
pub use request::{ClientRequest, Operation, ValidationError};
pub use response::{Outcome, RequestError, ServerResponse};
pub use version::{Version, VersionValue, VisibilityMap};
