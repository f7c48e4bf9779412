pub mod assertions;
pub mod server;
pub mod stores;

pub use assertions::{assert_xrpc_error, assert_xrpc_ok};
pub use server::{
    TEST_CURSOR_SECRET, TEST_JWT_SECRET, create_session_via_api, create_test_app_state,
    create_test_config, create_test_router, create_test_router_and_stores, send_request,
};
pub use stores::{FakeDataServer, TestStores, create_test_stores};
