//! Node registration approval loop.
//!
//! Polls the registrations of a site, approves the pending ones and
//! counts the ones that are already active until the requested cluster
//! size is reached or the deadline passes.

use std::collections::HashSet;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::time::{sleep, sleep_until, Instant};

use crate::api::RegistrationApi;
use crate::error::ApiError;
use crate::types::{ApprovalRequest, Registration, RegistrationState, TunnelType};

/// Parameters of a single `registernodes` run.
#[derive(Debug, Clone)]
pub struct RegisterNodes {
    pub site: String,
    pub tenant: String,
    pub size: u32,
    pub tunnel_type: TunnelType,
    pub delay: Duration,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// `count` registrations reached an active state.
    Registered { count: u32 },
    /// The deadline passed with only `count` registrations active.
    TimedOut { count: u32 },
}

/// Runs the approval loop. Only a failed fetch is returned as an error;
/// failed approvals are logged and retried on the next poll.
pub async fn register_nodes<A>(
    api: &A,
    params: &RegisterNodes,
) -> Result<RegistrationOutcome, ApiError>
where
    A: RegistrationApi + ?Sized,
{
    if !params.delay.is_zero() {
        info!("Delaying {:?} before processing registrations", params.delay);
        sleep(params.delay).await;
    }

    info!(
        "Waiting up to {:?} for {} node(s) of site {}",
        params.timeout, params.size, params.site
    );
    let deadline = Instant::now() + params.timeout;
    // (namespace, name) of every registration counted so far
    let mut counted: HashSet<(String, String)> = HashSet::new();

    while Instant::now() < deadline {
        let registrations = api.list_registrations(&params.site).await?;

        if registrations.is_empty() {
            debug!("No registrations for site {} yet", params.site);
        }

        for reg in &registrations {
            let key = (reg.namespace.clone(), reg.name.clone());
            if counted.contains(&key) {
                continue;
            }
            if !admit(api, reg, params).await {
                continue;
            }

            counted.insert(key);
            let count = counted.len() as u32;
            info!(
                "Registration {} ({}) counted, {}/{} nodes",
                reg.name,
                reg.hostname(),
                count,
                params.size
            );
            if count == params.size {
                info!("Site {} reached {} node(s)", params.site, count);
                return Ok(RegistrationOutcome::Registered { count });
            }
        }

        let wake = (Instant::now() + params.poll_interval).min(deadline);
        sleep_until(wake).await;
    }

    let count = counted.len() as u32;
    error!(
        "Timed out after {:?} waiting for site {}: {}/{} node(s) registered",
        params.timeout, params.site, count, params.size
    );
    Ok(RegistrationOutcome::TimedOut { count })
}

/// Approves a pending registration or accepts an already active one.
/// Returns whether the registration counts toward the cluster size.
async fn admit<A>(api: &A, reg: &Registration, params: &RegisterNodes) -> bool
where
    A: RegistrationApi + ?Sized,
{
    match reg.current_state {
        RegistrationState::Pending => {
            let request = ApprovalRequest::builder(reg)
                .fallback_tenant(&params.tenant)
                .cluster_size(params.size)
                .tunnel_type(params.tunnel_type)
                .build();
            debug!(
                "Approving {} as {} over {:?}, cluster_size {:?}",
                request.name(),
                request.state(),
                request.tunnel_type(),
                request.passport().get("cluster_size")
            );
            match api.approve(&request).await {
                Ok(()) => {
                    info!("Approved registration {} ({})", reg.name, reg.hostname());
                    true
                }
                Err(e) => {
                    warn!(
                        "Could not approve registration {} ({}): {}",
                        reg.name,
                        reg.hostname(),
                        e
                    );
                    false
                }
            }
        }
        state if state.is_active() => true,
        state => {
            debug!("Skipping registration {} in state {}", reg.name, state);
            false
        }
    }
}
