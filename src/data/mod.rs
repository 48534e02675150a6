pub mod report;
pub mod sample;

pub use report::{GatewayReport, LinkReport};
pub use sample::{LinkSample, TerminalRecord, TerminalStatusCount, DEGRADED_THRESHOLD, NO_DATA};
