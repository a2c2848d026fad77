use crate::ReapError::ConfigurationError;
use crate::{Port, ReapResult};

pub(crate) trait MaybeHasPort {
    fn get_port(&self) -> Option<Port>;
}

pub(crate) fn resolve_port(maybe_has_port: &dyn MaybeHasPort) -> ReapResult<Port> {
    match maybe_has_port.get_port() {
        Some(0) => Err(ConfigurationError("port 0 is not a valid port".to_string())),
        Some(port) => Ok(port),
        None => Err(ConfigurationError("unable to resolve a port".to_string())),
    }
}
