use cucumber::given;

use crate::cucumber::{world::ReconSystem, ReconWorld};

#[given(expr = "a fresh store watching account {string}")]
async fn fresh_store(world: &mut ReconWorld, account: String) {
    let system = ReconSystem::new(&account).await;
    world.system = Some(system);
}
