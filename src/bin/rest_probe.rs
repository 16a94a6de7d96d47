//! rest-probe: issue one authenticated request through a started client
//!
//! Usage:
//!   rest-probe <url> [--header <name:value>]... [--timeout-ms <ms>]
//!
//! The access token is read from `REST_PROBE_TOKEN`. Vendor headers given with
//! `--header` go through the same outbound filtering as client code.

use anyhow::{bail, Context};
use rest_client_base::{
    determine_headers, HttpRequest, MessageHeaders, RestClientBuilder, ShutdownReport,
    StaticTokenSession,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

struct Args {
    url: String,
    headers: MessageHeaders,
    timeout: Option<Duration>,
}

fn print_usage() {
    println!(
        r#"rest-probe: send one authenticated request and print the response headers

USAGE:
    rest-probe <url> [--header <name:value>]... [--timeout-ms <ms>]

OPTIONS:
    --header <name:value>   Message header; only sforce*/x-sfdc* are forwarded
    --timeout-ms <ms>       Termination timeout used when stopping the client

ENVIRONMENT:
    REST_PROBE_TOKEN        Access token (required)
    RUST_LOG                Log filter, e.g. rest_client_base=debug"#
    );
}

fn parse_args(args: &[String]) -> anyhow::Result<Args> {
    let mut url = None;
    let mut headers = MessageHeaders::new();
    let mut timeout = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--header" => {
                let raw = iter.next().context("--header needs a value")?;
                let (name, value) = raw
                    .split_once(':')
                    .with_context(|| format!("header `{raw}` is not name:value"))?;
                headers.set(name.trim(), value.trim());
            }
            "--timeout-ms" => {
                let raw = iter.next().context("--timeout-ms needs a value")?;
                let ms: u64 = raw.parse().with_context(|| format!("invalid timeout `{raw}`"))?;
                timeout = Some(Duration::from_millis(ms));
            }
            other if other.starts_with("--") => bail!("unknown option: {other}"),
            other => {
                if url.replace(other.to_string()).is_some() {
                    bail!("only one url may be given");
                }
            }
        }
    }

    Ok(Args {
        url: url.context("missing <url>")?,
        headers,
        timeout,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.is_empty() || argv.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }
    let args = parse_args(&argv)?;

    let token = std::env::var("REST_PROBE_TOKEN").context("REST_PROBE_TOKEN is not set")?;
    let mut builder = RestClientBuilder::new().session(Arc::new(StaticTokenSession::new(token)));
    if let Some(timeout) = args.timeout {
        builder = builder.termination_timeout(timeout);
    }
    let client = builder.build()?;
    client.start().await?;

    let request = HttpRequest::get(&args.url)?.forwarded_headers(&determine_headers(&args.headers));
    let completion = client.send(request).await;

    match client.stop().await {
        ShutdownReport::TimedOut { abandoned, .. } => {
            eprintln!("warning: {abandoned} request(s) abandoned at shutdown")
        }
        ShutdownReport::Drained { .. } | ShutdownReport::NotRunning => {}
    }

    let completion = completion?;
    if let Some(status) = completion.status {
        println!("HTTP {status}");
    }
    let mut headers: Vec<_> = completion.headers.into_iter().collect();
    headers.sort();
    for (name, value) in headers {
        println!("{name}: {value}");
    }

    match completion.result {
        Ok(body) => {
            println!();
            println!("{}", String::from_utf8_lossy(&body));
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
