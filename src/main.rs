use anyhow::Context;
use clap::Parser;
use shipping_gateway::config::cli::{Cli, Command};
use shipping_gateway::domain::model::{ApiResponse, CourierRateRequest, ServiceResponse};
use shipping_gateway::utils::error::ErrorCategory;
use shipping_gateway::utils::logger;
use shipping_gateway::{Gateway, GatewayConfig, RequestContext};
use serde::Serialize;
use std::io::Read;

/// Exit code for a response envelope.
fn exit_code(code: u16) -> i32 {
    match code {
        200..=299 => 0,
        404 => 2,
        400..=499 if code != 401 => 1,
        _ => 3,
    }
}

fn read_request(path: &str) -> anyhow::Result<CourierRateRequest> {
    let raw = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read rate request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read rate request file '{}'", path))?
    };
    serde_json::from_str(&raw).context("rate request is not valid JSON")
}

fn emit<T: Serialize>(resp: &ApiResponse<T>) -> anyhow::Result<i32> {
    println!("{}", serde_json::to_string_pretty(resp)?);
    Ok(exit_code(resp.code))
}

async fn run(cli: Cli, config: GatewayConfig) -> anyhow::Result<i32> {
    let gateway = Gateway::bootstrap(&config)
        .await
        .context("failed to start gateway")?;

    let ctx = match cli.trace_id {
        Some(trace_id) => RequestContext::with_trace_id(trace_id),
        None => RequestContext::new(),
    };
    tracing::info!(trace_id = %ctx.trace_id(), "🚀 Handling {:?}", cli.command);

    match cli.command {
        Command::Rates { request } => {
            let request = match read_request(&request) {
                Ok(request) => request,
                Err(e) => {
                    tracing::error!(trace_id = %ctx.trace_id(), "❌ {:#}", e);
                    let outcome =
                        ServiceResponse::bad_request(format!("invalid request format: {:#}", e));
                    let resp: ApiResponse<()> = ApiResponse::from_service(&outcome, None);
                    return emit(&resp);
                }
            };
            emit(&gateway.courier_rates(&ctx, &request).await)
        }
        Command::Track { waybill, courier } => emit(&gateway.track(&ctx, &waybill, &courier).await),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 載入 TOML 配置
    let config = match GatewayConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "❌ Failed to load config file '{}': {}",
                cli.config.display(),
                e
            );
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if cli.json_logs || config.json_logs() {
        logger::init_json_logger(cli.verbose, config.log_level());
    } else {
        logger::init_cli_logger(cli.verbose, config.log_level());
    }

    let code = match run(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            let category = e
                .downcast_ref::<shipping_gateway::GatewayError>()
                .map(|err| err.category());
            tracing::error!("❌ {:#} (category: {:?})", e, category);
            eprintln!("❌ {:#}", e);
            match category {
                Some(ErrorCategory::ClientInput) | Some(ErrorCategory::Configuration) => 1,
                Some(ErrorCategory::NotFound) => 2,
                _ => 3,
            }
        }
    };

    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(200), 0);
        assert_eq!(exit_code(400), 1);
        assert_eq!(exit_code(404), 2);
        assert_eq!(exit_code(401), 3);
        assert_eq!(exit_code(500), 3);
        assert_eq!(exit_code(503), 3);
    }
}
