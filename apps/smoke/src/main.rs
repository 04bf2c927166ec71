use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{ensure, Context};
use pipedrive_client::{ContactField, NewPerson, Organization, Person, PipedriveClient};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ORG_NAME: &str = "Test Org for Person";
const LABEL_IDS: [i64; 2] = [14, 16];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipedrive_smoke=info,pipedrive_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    pipedrive_shared_config::load_dotenv();

    let client = PipedriveClient::from_env().context("failed to configure Pipedrive client")?;
    info!(base_url = %client.config().base_url, "Starting Pipedrive smoke check");

    let org = client
        .create_organization(ORG_NAME)
        .await
        .context("failed to create organization")?;

    let mut created = None;
    let outcome = check_person(&client, &org, &mut created).await;

    // Cleanup runs whatever the checks concluded
    let mut cleanup: anyhow::Result<()> = Ok(());
    if let Some(person_id) = created {
        if let Err(e) = client.delete_person(person_id).await {
            warn!(person_id, error = %e, "Failed to delete smoke person");
            cleanup = Err(anyhow::Error::new(e).context("failed to delete person"));
        }
    }
    if let Err(e) = client.delete_organization(org.id).await {
        warn!(org_id = org.id, error = %e, "Failed to delete smoke organization");
        if cleanup.is_ok() {
            cleanup = Err(anyhow::Error::new(e).context("failed to delete organization"));
        }
    }

    outcome?;
    cleanup?;
    info!("Smoke check passed");
    Ok(())
}

/// Create a fully populated person under `org` and check it on create and fetch
async fn check_person(
    client: &PipedriveClient,
    org: &Organization,
    created: &mut Option<i64>,
) -> anyhow::Result<()> {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let input = NewPerson::new(format!("Smoke Person {}", stamp))
        .email(vec![
            ContactField::primary("work", format!("smoke.{}@example.com", stamp)),
            ContactField::secondary("home", format!("smoke.{}@example.net", stamp)),
        ])
        .phone(vec![
            ContactField::primary("mobile", "+1 (555) 010-0001"),
            ContactField::secondary("work", "555-010-0002"),
        ])
        .label_ids(LABEL_IDS.to_vec())
        .org_id(org.id);

    let person = client
        .create_person(&input)
        .await
        .context("failed to create person")?;
    *created = Some(person.id);
    verify(&person, &input, org, "created")?;

    let fetched = client
        .get_person(person.id)
        .await
        .context("failed to fetch person")?;
    verify(&fetched, &input, org, "fetched")
}

fn verify(
    person: &Person,
    input: &NewPerson,
    org: &Organization,
    stage: &str,
) -> anyhow::Result<()> {
    ensure!(person.name == input.name, "{} person name mismatch", stage);
    ensure!(
        person.organization_id() == Some(org.id),
        "{} person org_id mismatch: expected {}, got {:?}",
        stage,
        org.id,
        person.organization_id()
    );
    ensure!(
        person.label_ids == input.label_ids,
        "{} person label_ids mismatch: {:?}",
        stage,
        person.label_ids
    );
    ensure!(
        input.email.as_ref() == Some(&person.email),
        "{} person email mismatch",
        stage
    );
    ensure!(
        input.phone.as_ref() == Some(&person.phone),
        "{} person phone mismatch",
        stage
    );
    info!(person_id = person.id, stage, "Person fields round-tripped");
    Ok(())
}
