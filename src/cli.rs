//! Command line: `serve` runs the service, the rest call a running one.

use clap::{Parser, Subcommand};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tabled::{Table, Tabled};

use crate::config::AppConfig;
use crate::domain::{Portfolio, PortfolioResponse, StrategyName, SupportedCurrency};
use crate::error::{HodlError, Result};
use crate::signing::{ApiKey, RequestSigner, SignerSettings};

#[derive(Parser)]
#[command(name = "hodl")]
#[command(version = "0.1.0")]
#[command(about = "Single-strategy investment manager for a brokerage account", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding default.toml and environment overrides
    #[arg(short, long, default_value = "config", global = true)]
    pub config: String,

    /// Base URL of a running service (defaults to the configured listen address)
    #[arg(long, env = "HODL_SERVICE_URL", global = true)]
    pub service_url: Option<String>,

    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the HTTP service
    Serve,
    /// List brokerage portfolios
    Portfolio,
    /// Show the balance breakdown of one portfolio
    PortfolioDetails {
        uuid: String,
    },
    /// Create a portfolio
    CreatePortfolio {
        name: String,
    },
    /// Run a strategy against a portfolio
    ExecuteStrategy {
        portfolio: String,
        strategy: String,
        currency: String,
    },
    /// Move cash between two portfolios
    TransferFunds {
        sender: String,
        receiver: String,
        amount: String,
    },
    /// Print a bearer token for GET /products
    GetToken,
}

/// Output mode for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct PortfolioRow {
    name: String,
    uuid: String,
    #[tabled(rename = "type")]
    kind: String,
    deleted: bool,
}

impl From<&Portfolio> for PortfolioRow {
    fn from(p: &Portfolio) -> Self {
        Self {
            name: p.name.clone(),
            uuid: p.uuid.clone(),
            kind: p.portfolio_type.clone(),
            deleted: p.deleted,
        }
    }
}

/// Thin HTTP client for a running service
pub struct ServiceClient {
    http: Client,
    base_url: String,
}

impl ServiceClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent("hodl-cli/0.1")
            .build()
            .map_err(|e| HodlError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T> {
        let mut req = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            return Err(HodlError::Other(anyhow::anyhow!("{}: {}", status, message)));
        }

        Ok(serde_json::from_str(&text)?)
    }

    pub async fn portfolios(&self) -> Result<PortfolioResponse> {
        self.call(Method::GET, "/portfolios", None).await
    }

    pub async fn portfolio_details(&self, uuid: &str) -> Result<Value> {
        self.call(Method::GET, &format!("/portfolios/{}", uuid), None).await
    }

    pub async fn create_portfolio(&self, name: &str) -> Result<Value> {
        self.call(Method::POST, "/portfolios", Some(json!({ "name": name })))
            .await
    }

    pub async fn execute_strategy(
        &self,
        portfolio: &str,
        strategy: StrategyName,
        currency: SupportedCurrency,
    ) -> Result<Value> {
        let body = json!({
            "portfolio": portfolio,
            "strategy": strategy,
            "currency": currency,
        });
        self.call(Method::POST, "/execute-strategy", Some(body)).await
    }

    pub async fn transfer_funds(&self, sender: &str, receiver: &str, amount: &str) -> Result<Value> {
        let body = json!({
            "sender_id": sender,
            "receiver_id": receiver,
            "amount": amount,
        });
        self.call(Method::POST, "/transfer-funds", Some(body)).await
    }
}

/// Run any command other than `serve`
pub async fn run_client_command(cli: &Cli, config: &AppConfig) -> Result<()> {
    let mode = OutputMode::from_json_flag(cli.json);
    let base_url = cli
        .service_url
        .clone()
        .unwrap_or_else(|| config.server.base_url());
    let client = ServiceClient::new(&base_url)?;

    match &cli.command {
        Commands::Serve => {
            return Err(HodlError::Internal("serve is not a client command".into()));
        }
        Commands::Portfolio => {
            let resp = client.portfolios().await?;
            match mode {
                OutputMode::Json => print_json(&resp)?,
                OutputMode::Table => {
                    let rows: Vec<PortfolioRow> = resp.portfolios.iter().map(PortfolioRow::from).collect();
                    print_table(&rows);
                }
            }
        }
        Commands::PortfolioDetails { uuid } => print_json(&client.portfolio_details(uuid).await?)?,
        Commands::CreatePortfolio { name } => print_json(&client.create_portfolio(name).await?)?,
        Commands::ExecuteStrategy {
            portfolio,
            strategy,
            currency,
        } => {
            let strategy: StrategyName = strategy.parse()?;
            let currency: SupportedCurrency = currency.parse()?;
            print_json(&client.execute_strategy(portfolio, strategy, currency).await?)?;
        }
        Commands::TransferFunds {
            sender,
            receiver,
            amount,
        } => print_json(&client.transfer_funds(sender, receiver, amount).await?)?,
        Commands::GetToken => println!("{}", products_token(config)?),
    }

    Ok(())
}

/// Bearer token for `GET <brokerage>/products`
pub fn products_token(config: &AppConfig) -> Result<String> {
    let api_key = ApiKey::from_file(&config.brokerage.api_key_path)?;
    let signer = RequestSigner::new(
        &api_key,
        SignerSettings {
            service: config.brokerage.service.clone(),
            issuer: config.brokerage.issuer.clone(),
        },
    )?;
    let url = format!("{}/products", config.brokerage.base_url.trim_end_matches('/'));
    signer.sign_url("GET", &url)
}

fn print_table<T: Tabled>(items: &[T]) {
    if items.is_empty() {
        println!("(no results)");
    } else {
        println!("{}", Table::new(items));
    }
}

fn print_json<T: Serialize>(item: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(item)?);
    Ok(())
}
