//! MXF CLI — encode, decode, export and purge data-subject private data
//!
//! Commands:
//!   mxf encode  — protect private paths of a JSON message
//!   mxf decode  — restore an encoded message
//!   mxf dsid    — look up the DSID for a profile
//!   mxf export  — export a data subject's private data
//!   mxf purge   — permanently erase a data subject's private data
//!   mxf vault   — show vault statistics
//!   mxf demo    — run the full lifecycle end to end
//!
//! All commands run against the in-process executor, whose vault is persisted
//! to `mxf-vault.json`.

use mxf_core::executor::MemoryExecutor;
use mxf_core::{CallContext, ClientConfig, Dsid, EncodedResponse, PrivateClient, Transform};
use serde_json::{json, Value};
use std::env;
use std::path::Path;
use std::sync::Arc;

const VAULT_FILE: &str = "mxf-vault.json";
const CONFIG_FILE: &str = "mxf.json";

fn print_usage() {
    println!(
        r#"
MXF — data-subject message transforms

Usage: mxf <command> [options]

Commands:
  encode  <message> <transforms>   Encode a message (JSON literal or file path)
  decode  <encoded>                Decode an encoded message
  dsid    <profile>                Look up the DSID for a profile
  export  <dsid>                   Export a data subject's private data
  purge   <dsid>                   Erase a data subject's private data
  vault                            Show vault statistics
  demo                             Run the full lifecycle demo

Examples:
  mxf encode order.json '[{{"context_path":"customer","header":{{"profile_paths":["email"],"private_paths":["ssn"],"encryptor":"AES-256","compressor":"zlib"}}}}]'
  mxf dsid '{{"email":"alice@example.com"}}'
  mxf purge dsid-3f2a...
"#
    );
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    let result = match args[1].as_str() {
        "encode" => cmd_encode(&args[2..]).await,
        "decode" => cmd_decode(&args[2..]).await,
        "dsid" => cmd_dsid(&args[2..]).await,
        "export" => cmd_export(&args[2..]).await,
        "purge" => cmd_purge(&args[2..]).await,
        "vault" => cmd_vault().await,
        "demo" => cmd_demo().await,
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("  Error: {}", e);
        std::process::exit(1);
    }
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Open the persisted vault and a client over it
fn open_client() -> Result<(Arc<MemoryExecutor>, PrivateClient), Box<dyn std::error::Error>> {
    let config = if Path::new(CONFIG_FILE).exists() {
        ClientConfig::load(CONFIG_FILE)?
    } else {
        ClientConfig::default()
    };
    let executor = Arc::new(MemoryExecutor::open(VAULT_FILE));
    let client = PrivateClient::new(executor.clone()).with_config(config)?;
    Ok((executor, client))
}

/// Accept a JSON literal or a path to a JSON file
fn load_json(arg: &str) -> Result<Value, Box<dyn std::error::Error>> {
    if let Ok(v) = serde_json::from_str(arg) {
        return Ok(v);
    }
    let data = std::fs::read_to_string(arg)?;
    Ok(serde_json::from_str(&data)?)
}

async fn cmd_encode(args: &[String]) -> CmdResult {
    if args.len() < 2 {
        eprintln!("Usage: mxf encode <message> <transforms>");
        return Ok(());
    }
    let message = load_json(&args[0])?;
    let transforms: Vec<Transform> = serde_json::from_value(load_json(&args[1])?)?;

    let (_, client) = open_client()?;
    let ctx = CallContext::background().with_transaction_id();
    let encoded = client.encode(&ctx, &message, &transforms, vec![]).await?;
    println!("{}", serde_json::to_string_pretty(&encoded)?);
    if !ctx.transaction_id().is_empty() {
        eprintln!("  tx: {}", ctx.transaction_id());
    }
    Ok(())
}

async fn cmd_decode(args: &[String]) -> CmdResult {
    if args.is_empty() {
        eprintln!("Usage: mxf decode <encoded>");
        return Ok(());
    }
    let encoded = EncodedResponse::from_value(load_json(&args[0])?);
    let (_, client) = open_client()?;
    let decoded: Value = client
        .decode(&CallContext::background(), Some(&encoded), vec![])
        .await?;
    println!("{}", serde_json::to_string_pretty(&decoded)?);
    Ok(())
}

async fn cmd_dsid(args: &[String]) -> CmdResult {
    if args.is_empty() {
        eprintln!("Usage: mxf dsid <profile>");
        return Ok(());
    }
    let profile = load_json(&args[0])?;
    let (_, client) = open_client()?;
    let dsid = client
        .profile_to_dsid(&CallContext::background(), &profile, vec![])
        .await?;
    println!("{}", dsid);
    Ok(())
}

async fn cmd_export(args: &[String]) -> CmdResult {
    if args.is_empty() {
        eprintln!("Usage: mxf export <dsid>");
        return Ok(());
    }
    let (_, client) = open_client()?;
    let exported = client
        .export(&CallContext::background(), &Dsid::new(args[0].as_str()), vec![])
        .await?;
    if exported.is_empty() {
        println!("  No private data held for {}", args[0]);
    } else {
        println!("{}", serde_json::to_string_pretty(&exported)?);
    }
    Ok(())
}

async fn cmd_purge(args: &[String]) -> CmdResult {
    if args.is_empty() {
        eprintln!("Usage: mxf purge <dsid>");
        return Ok(());
    }
    let (_, client) = open_client()?;
    let ctx = CallContext::background().with_transaction_id();
    client
        .purge(&ctx, &Dsid::new(args[0].as_str()), vec![])
        .await?;
    println!("  Purged {} (tx {})", args[0], ctx.transaction_id());
    Ok(())
}

async fn cmd_vault() -> CmdResult {
    let (executor, _) = open_client()?;
    println!("  {}", executor.summary().await);
    Ok(())
}

async fn cmd_demo() -> CmdResult {
    println!("\nMXF — Full Lifecycle Demo");
    println!("{}", "=".repeat(60));

    // Fresh in-memory vault; the demo never touches the persisted one
    let executor = Arc::new(MemoryExecutor::new().with_method("submit_order", |mut params| {
        params.pop().ok_or_else(|| "missing order payload".to_string())
    }));
    let client = PrivateClient::new(executor.clone());
    let ctx = CallContext::background();

    let order = json!({
        "order_id": "o-1001",
        "total": 42.5,
        "customer": {
            "email": "alice@example.com",
            "name": "Alice Liddell",
            "address": {"street": "1 Rabbit Hole", "city": "Oxford"},
        },
    });
    let transforms = vec![Transform::new("customer")
        .profile_path("email")
        .private_path("name")
        .private_path("address.street")
        .encryptor(mxf_core::Encryptor::Aes256)
        .compressor(mxf_core::Compressor::Zlib)];

    println!("\nStep 1: Fast path (no transforms)");
    println!("{}", "-".repeat(60));
    let raw = client.encode(&ctx, &order, &[], vec![]).await?;
    println!("  encoded={} (no executor call)", raw.is_encoded());

    println!("\nStep 2: Encode private paths");
    println!("{}", "-".repeat(60));
    let unit = ctx.with_transaction_id();
    let encoded = client.encode(&unit, &order, &transforms, vec![]).await?;
    println!("  {}", serde_json::to_string(&encoded)?);
    println!("  tx: {}", unit.transaction_id());

    println!("\nStep 3: Decode");
    println!("{}", "-".repeat(60));
    let decoded: Value = client.decode(&ctx, Some(&encoded), vec![]).await?;
    println!("  round trip ok: {}", decoded == order);

    println!("\nStep 4: Wrapped call");
    println!("{}", "-".repeat(60));
    let submit = client.wrap_call("submit_order", transforms.clone());
    let reply: Value = submit.call(&ctx, &order, vec![]).await?;
    println!("  submit_order reply matches: {}", reply == order);

    println!("\nStep 5: Export data subject");
    println!("{}", "-".repeat(60));
    let dsid = client
        .profile_to_dsid(&ctx, &json!({"email": "alice@example.com"}), vec![])
        .await?;
    let exported = client.export(&ctx, &dsid, vec![]).await?;
    println!("  {} -> {}", dsid, serde_json::to_string(&exported)?);

    println!("\nStep 6: Purge data subject");
    println!("{}", "-".repeat(60));
    client.purge(&ctx, &dsid, vec![]).await?;
    let after: Value = client.decode(&ctx, Some(&encoded), vec![]).await?;
    println!("  after purge: {}", serde_json::to_string(&after)?);

    println!("\n  {}", executor.summary().await);
    println!("  calls: {:?}", executor.call_log());
    Ok(())
}
