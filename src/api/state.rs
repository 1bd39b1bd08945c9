use std::sync::Arc;
use crate::{
    config::Settings,
    payments::{CallbackReconciler, StkPushService},
    service::ServiceContext,
};

#[derive(Clone)]
pub struct AppState {
    pub service_context: Arc<ServiceContext>,
    pub stk_push: Arc<StkPushService>,
    pub reconciler: Arc<CallbackReconciler>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        service_context: Arc<ServiceContext>,
        stk_push: Arc<StkPushService>,
        reconciler: Arc<CallbackReconciler>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            service_context,
            stk_push,
            reconciler,
            settings,
        }
    }
}
