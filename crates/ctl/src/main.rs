use clap::{Parser, Subcommand};
use readyboard_core::api::{
    ProvisioningStatus, StartResponse, StatusSnapshot, StopResponse, SubmissionList,
    SubmissionTriggerResponse,
};
use readyboard_core::model::{ClassificationResult, HealthSnapshot};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "readyboardctl", about = "Command line client for readyboard-daemon")]
struct Args {
    /// Daemon base URL.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8787")]
    daemon: String,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Cached snapshot, no probing.
    Status,
    /// Fresh health probe.
    Health,
    Provision {
        #[command(subcommand)]
        action: ProvisionCmd,
    },
    /// Classify an utterance.
    Classify { text: String },
    Submissions {
        #[command(subcommand)]
        action: SubmissionsCmd,
    },
}

#[derive(Subcommand, Debug)]
enum ProvisionCmd {
    Status,
    Start,
    Stop,
}

#[derive(Subcommand, Debug)]
enum SubmissionsCmd {
    List,
    Trigger,
}

struct Client {
    http: reqwest::Client,
    base: String,
}

impl Client {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base.trim_end_matches('/'), path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        Ok(self
            .http
            .get(self.url(path))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> anyhow::Result<T> {
        Ok(self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let client = Client {
        http: reqwest::Client::new(),
        base: args.daemon,
    };

    match args.cmd {
        Cmd::Status => print(&client.get::<StatusSnapshot>("/v1/status").await?)?,
        Cmd::Health => {
            let health: HealthSnapshot = client.get("/v1/health").await?;
            print(&health)?;
            if health.is_degraded() {
                eprintln!("warning: one or more services are degraded");
            }
        }
        Cmd::Provision { action } => match action {
            ProvisionCmd::Status => {
                print(&client.get::<ProvisioningStatus>("/v1/provision").await?)?
            }
            ProvisionCmd::Start => print(
                &client
                    .post::<_, StartResponse>("/v1/provision", &json!({ "action": "start" }))
                    .await?,
            )?,
            ProvisionCmd::Stop => print(
                &client
                    .post::<_, StopResponse>("/v1/provision", &json!({ "action": "stop" }))
                    .await?,
            )?,
        },
        Cmd::Classify { text } => print(
            &client
                .post::<_, ClassificationResult>("/v1/voice", &json!({ "text": text }))
                .await?,
        )?,
        Cmd::Submissions { action } => match action {
            SubmissionsCmd::List => print(&client.get::<SubmissionList>("/v1/submissions").await?)?,
            SubmissionsCmd::Trigger => print(
                &client
                    .post::<_, SubmissionTriggerResponse>("/v1/submissions/trigger", &json!({}))
                    .await?,
            )?,
        },
    }

    Ok(())
}
