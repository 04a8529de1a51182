pub mod generate_cmd;
pub mod inspect_cmd;
pub mod resolve_cmd;

pub use generate_cmd::cmd_generate;
pub use inspect_cmd::cmd_inspect;
pub use resolve_cmd::cmd_resolve;
