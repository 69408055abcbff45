//! Site lifecycle actions.

use log::info;

use crate::api::RegistrationApi;
use crate::error::ApiError;
use crate::types::SiteStateRequest;

/// Marks `site` for decommissioning with a single state transition.
pub async fn decommission_site<A>(api: &A, site: &str) -> Result<(), ApiError>
where
    A: RegistrationApi + ?Sized,
{
    let request = SiteStateRequest::decommission(site);
    info!("Requesting decommission of site {}", site);
    api.set_site_state(&request).await?;
    info!("Site {} is now decommissioning", site);
    Ok(())
}
