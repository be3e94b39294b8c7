//! The agent card at the well-known path.

use crate::common::{scripted_agent, spawn_server};

/// **Scenario**: the card is served with the agent identity and capabilities.
#[tokio::test]
async fn card_served_at_well_known_path() {
    let agent = scripted_agent(vec![]);
    let (url, _manager) = spawn_server(agent).await;

    let card: serde_json::Value = reqwest::get(format!("{url}/.well-known/agent.json"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(card["name"], "e2e-agent");
    assert_eq!(card["capabilities"]["streaming"], true);
    assert_eq!(card["capabilities"]["pushNotifications"], true);
    assert_eq!(card["defaultInputModes"][0], "text");
}
