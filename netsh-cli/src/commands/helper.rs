//! Helper library commands

use std::io::Write;

use anyhow::Result;
use clap::{Args, Subcommand};
use netsh_core::{HelperHost, HelperHostConfig};
use netsh_helper_api::status;

use crate::config::NetshConfig;

/// Helper management arguments
#[derive(Args)]
pub struct HelperArgs {
    #[command(subcommand)]
    pub command: HelperCommands,
}

/// Helper subcommands
#[derive(Subcommand)]
pub enum HelperCommands {
    /// Load a helper library and remember it for the next start
    Add {
        /// Path to the helper library
        path: String,
    },
    /// Unload a helper library and forget it
    Delete {
        /// File name of the library, as shown by `helper show`
        name: String,
    },
    /// List registered helpers
    Show,
}

/// Run helper command
pub fn run(args: HelperArgs, config: &NetshConfig) -> Result<()> {
    let mut host = HelperHost::new(HelperHostConfig {
        store_path: config.helpers.store_path.clone(),
    });

    if config.helpers.auto_load {
        let loaded = host.load_all_persisted();
        tracing::debug!(loaded, "Persisted helper libraries loaded");
    }

    let mut stdout = std::io::stdout().lock();
    let code = execute(&mut host, args.command, &mut stdout);
    check(code)
}

fn execute(host: &mut HelperHost, command: HelperCommands, out: &mut dyn Write) -> u32 {
    match command {
        HelperCommands::Add { path } => host.add_helper(&[path.as_str()]),
        HelperCommands::Delete { name } => host.delete_helper(&[name.as_str()]),
        HelperCommands::Show => {
            let contexts = host.helper_contexts();
            host.show_helpers(Some(&contexts), out)
        }
    }
}

fn check(code: u32) -> Result<()> {
    if code == status::NO_ERROR {
        return Ok(());
    }
    anyhow::bail!("{} (status {})", status::describe(code), code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsh_core::helpers::{MemoryReferenceStore, NativeLoader};

    fn host() -> HelperHost {
        HelperHost::with_parts(
            Box::new(NativeLoader),
            Box::new(MemoryReferenceStore::new()),
        )
    }

    #[test]
    fn test_show_empty_registry_prints_header() {
        let mut host = host();
        let mut out: Vec<u8> = Vec::new();

        let code = execute(&mut host, HelperCommands::Show, &mut out);

        assert_eq!(code, status::NO_ERROR);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Helper GUID"));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_delete_unknown_helper() {
        let mut host = host();
        let code = execute(
            &mut host,
            HelperCommands::Delete {
                name: "ifmon.so".to_string(),
            },
            &mut Vec::<u8>::new(),
        );
        assert_eq!(code, status::ERROR_FILE_NOT_FOUND);
    }

    #[test]
    fn test_add_missing_library() {
        let mut host = host();
        let code = execute(
            &mut host,
            HelperCommands::Add {
                path: "/nonexistent/netsh/ifmon.so".to_string(),
            },
            &mut Vec::<u8>::new(),
        );
        assert_eq!(code, status::ERROR_DLL_LOAD_FAILED);
    }

    #[test]
    fn test_check_maps_status_to_error() {
        assert!(check(status::NO_ERROR).is_ok());

        let err = check(status::ERROR_INVALID_PARAMETER).unwrap_err();
        assert!(err.to_string().contains("status 87"));
    }
}
