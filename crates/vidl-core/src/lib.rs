pub mod config;
pub mod events;
pub mod state;
pub mod types;
pub mod validation;

pub use config::*;
pub use events::*;
pub use state::*;
pub use types::*;
pub use validation::*;

#[cfg(test)]
mod tests {
    use super::{
        decode_push, parse_client_config, validate_request, EngineEvent, PushChannel, TaskId,
        TaskStatus, Validate,
    };
    use std::any::TypeId;

    #[test]
    fn crate_root_reexports_core_types() {
        let _ = TypeId::of::<TaskId>();
        let _ = TypeId::of::<TaskStatus>();
        let _ = TypeId::of::<EngineEvent>();
        let _ = TypeId::of::<PushChannel>();
    }

    #[test]
    fn crate_root_reexports_parse_and_validate_helpers() {
        let _decode = decode_push;
        let _validate_request = validate_request;

        let mut config = parse_client_config(
            r#"
[progress]
coalesce_ms = 500

[retry]
attempts = 3
delay_ms = 1000
"#,
        )
        .expect("parse config");
        assert!(config.validate().is_empty());

        config.retry.attempts = 0;
        assert!(config
            .validate()
            .iter()
            .any(|issue| issue.code == "retry.attempts.zero"));
    }
}
