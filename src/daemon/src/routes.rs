use std::sync::LazyLock;

use axum::routing::{get, post, MethodRouter};

use crate::handlers::add::{add, ADD_ENDPOINT};
use crate::handlers::disable::{disable, DISABLE_ENDPOINT};
use crate::handlers::enable::{enable, ENABLE_ENDPOINT};
use crate::handlers::info::{info, INFO_ENDPOINT};
use crate::handlers::list::{list, LIST_ENDPOINT};
use crate::handlers::remove::{remove, REMOVE_ENDPOINT};
use crate::handlers::terminate::{terminate, TERMINATE_ENDPOINT};
use crate::state::DaemonState;

pub(crate) static ROUTES: LazyLock<Vec<(&'static str, MethodRouter<DaemonState>)>> =
    LazyLock::new(|| {
        vec![
            (ENABLE_ENDPOINT, post(enable)),
            (DISABLE_ENDPOINT, post(disable)),
            (ADD_ENDPOINT, post(add)),
            (REMOVE_ENDPOINT, post(remove)),
            (LIST_ENDPOINT, get(list)),
            (INFO_ENDPOINT, get(info)),
            (TERMINATE_ENDPOINT, post(terminate)),
        ]
    });
