use crate::cmd::{load_config, runtime};
use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use relsync_core::store::Store;
use std::path::Path;

#[derive(Subcommand)]
pub enum StoreSubcommand {
    /// Print the value stored at a key
    Get { key: String },
    /// Write a value at a key, creating parent buckets
    Put {
        key: String,
        #[arg(long)]
        value: String,
        /// Replace an existing value
        #[arg(long)]
        overwrite: bool,
    },
    /// Delete a key, or a bucket and everything under it
    Rm { key: String },
    /// List the buckets directly under a key
    Ls { key: String },
}

pub fn run(config_path: &Path, subcmd: StoreSubcommand, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store_path = config.store_path();

    runtime()?.block_on(async {
        let store = Store::open(&store_path)
            .with_context(|| format!("failed to open version store {}", store_path.display()))?;
        let handle = store.handle();
        let result = match subcmd {
            StoreSubcommand::Get { key } => match handle.get(&key).await {
                Ok(bytes) => {
                    let value = String::from_utf8_lossy(&bytes).into_owned();
                    if json {
                        print_json(&serde_json::json!({ "key": key, "value": value }))
                    } else {
                        println!("{value}");
                        Ok(())
                    }
                }
                Err(e) => Err(anyhow::Error::new(e).context(format!("get {key}"))),
            },
            StoreSubcommand::Put {
                key,
                value,
                overwrite,
            } => handle
                .write(&key, value.into_bytes(), overwrite)
                .await
                .with_context(|| format!("put {key}")),
            StoreSubcommand::Rm { key } => {
                handle.delete(&key).await.with_context(|| format!("rm {key}"))
            }
            StoreSubcommand::Ls { key } => match handle.list_buckets(&key).await {
                Ok(names) if json => print_json(&names),
                Ok(names) => {
                    for name in names {
                        println!("{name}");
                    }
                    Ok(())
                }
                Err(e) => Err(anyhow::Error::new(e).context(format!("ls {key}"))),
            },
        };
        drop(handle);
        store.shutdown().await;
        result
    })
}
