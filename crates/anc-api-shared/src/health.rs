use crate::wire::HealthRes;

/// Health service used by the REST API and the CLI.
pub struct HealthService;

impl HealthService {
    /// Returns a `HealthRes` indicating the service is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "ANC report service is alive".into(),
        }
    }
}
