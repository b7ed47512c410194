/// Where this notifier instance is running.
///
/// Step-level event delegation only happens on the controller: a step
/// manager hosted on a compute node never re-delegates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostRole {
    #[default]
    Controller,
    StepManager,
}

/// Configuration for the notification router and agent dispatcher.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Maximum seconds a client may stay silent before the periodic ping
    /// probes it. Zero disables pinging entirely.
    pub inactive_limit_secs: u64,

    /// Per-send timeout budget in seconds. Also a term in the ping
    /// threshold arithmetic.
    pub msg_timeout_secs: u64,

    /// Privileged user id used when addressing node daemons (batch host,
    /// delegated step manager) instead of the job owner's processes.
    pub daemon_uid: u32,

    /// Highest protocol version this host speaks. Outbound requests are
    /// negotiated down to `min(max_protocol_version, peer's version)`.
    pub max_protocol_version: u16,

    /// Port used when a destination carries no resolved address and the
    /// transport must reach a node daemon by hostname.
    pub daemon_port: u16,

    /// Whether this instance is the controller or a delegated step manager.
    pub host_role: HostRole,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            inactive_limit_secs: 0,
            msg_timeout_secs: 10,
            daemon_uid: 0,
            max_protocol_version: 1,
            daemon_port: 6818,
            host_role: HostRole::Controller,
        }
    }
}

impl NotifierConfig {
    pub fn with_inactive_limit(mut self, secs: u64) -> Self {
        self.inactive_limit_secs = secs;
        self
    }

    pub fn with_msg_timeout(mut self, secs: u64) -> Self {
        self.msg_timeout_secs = secs;
        self
    }

    pub fn with_daemon_uid(mut self, uid: u32) -> Self {
        self.daemon_uid = uid;
        self
    }

    pub fn with_max_protocol_version(mut self, version: u16) -> Self {
        self.max_protocol_version = version;
        self
    }

    pub fn with_host_role(mut self, role: HostRole) -> Self {
        self.host_role = role;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifier_config_default() {
        let cfg = NotifierConfig::default();
        assert_eq!(cfg.inactive_limit_secs, 0);
        assert_eq!(cfg.msg_timeout_secs, 10);
        assert_eq!(cfg.daemon_uid, 0);
        assert_eq!(cfg.max_protocol_version, 1);
        assert_eq!(cfg.daemon_port, 6818);
        assert_eq!(cfg.host_role, HostRole::Controller);
    }

    #[test]
    fn notifier_config_builders() {
        let cfg = NotifierConfig::default()
            .with_inactive_limit(120)
            .with_msg_timeout(5)
            .with_daemon_uid(401)
            .with_max_protocol_version(9)
            .with_host_role(HostRole::StepManager);
        assert_eq!(cfg.inactive_limit_secs, 120);
        assert_eq!(cfg.msg_timeout_secs, 5);
        assert_eq!(cfg.daemon_uid, 401);
        assert_eq!(cfg.max_protocol_version, 9);
        assert_eq!(cfg.host_role, HostRole::StepManager);
    }
}
