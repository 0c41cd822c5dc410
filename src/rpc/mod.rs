//! JSON-RPC 2.0 layer: protocol types, the procedure table, and the router.
//!
//! - `protocol` - envelope types and error codes
//! - `procedure` - the `Procedure` trait, `Params` accessors, `ProcedureTable`
//! - `router` - parse/validate/dispatch for single requests and batches

pub mod procedure;
pub mod protocol;
pub mod router;

pub use procedure::{Params, Procedure, ProcedureTable};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};
pub use router::{JsonRpcRouter, RpcOutcome};
