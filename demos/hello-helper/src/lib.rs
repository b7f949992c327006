//! Hello Helper - A simple example helper library for netsh
//!
//! This library demonstrates:
//! - Exporting `InitHelperDll` with the `export_init_helper_dll!` macro
//! - Registering a root helper and a child nested under it
//! - Start and stop routines called by the shell
//!
//! ## Building
//!
//! ```bash
//! cargo build --release
//! ```
//!
//! ## Installing
//!
//! ```bash
//! netsh helper add "$PWD/target/release/libhello_helper.so"
//! netsh helper show
//! ```

use std::sync::atomic::{AtomicU32, Ordering};

use netsh_helper_api::abi::{HelperHostTable, RawGuid, RawHelperAttributes};
use netsh_helper_api::status::NO_ERROR;
use netsh_helper_api::{HelperError, HelperId, NETSH_VERSION, export_init_helper_dll};

/// `{6E6C6568-6F6C-0000-0000-000000000001}`
pub const HELLO_HELPER: HelperId = HelperId::from_fields(
    0x6e6c_6568,
    0x6f6c,
    0x0000,
    [0, 0, 0, 0, 0, 0, 0, 0x01],
);

/// `{6E6C6568-6F6C-0000-0000-000000000002}`, registered under [`HELLO_HELPER`]
pub const WORLD_HELPER: HelperId = HelperId::from_fields(
    0x6e6c_6568,
    0x6f6c,
    0x0000,
    [0, 0, 0, 0, 0, 0, 0, 0x02],
);

static RUNNING: AtomicU32 = AtomicU32::new(0);

unsafe extern "C" fn start(_parent: *const RawGuid, _version: u32) -> u32 {
    let running = RUNNING.fetch_add(1, Ordering::SeqCst) + 1;
    eprintln!("[hello-helper] started ({running} running)");
    NO_ERROR
}

unsafe extern "C" fn stop(_reserved: u32) -> u32 {
    let running = RUNNING.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
    eprintln!("[hello-helper] stopped ({running} running)");
    NO_ERROR
}

fn init(netsh_version: u32, host: &HelperHostTable<'_>) -> Result<(), HelperError> {
    if netsh_version != NETSH_VERSION {
        return Err(HelperError::InvalidParameter(format!(
            "unsupported netsh version {netsh_version}"
        )));
    }

    let mut hello = RawHelperAttributes::new(RawGuid::from(HELLO_HELPER));
    hello.start = Some(start);
    hello.stop = Some(stop);
    host.register_helper(None, &hello)?;

    let mut world = RawHelperAttributes::new(RawGuid::from(WORLD_HELPER));
    world.start = Some(start);
    world.stop = Some(stop);
    host.register_helper(Some(HELLO_HELPER), &world)
}

export_init_helper_dll!(init);
