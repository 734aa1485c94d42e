use std::fmt::{self, Display};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::context::RequestContext;
use crate::decode;
use crate::descriptor::{ApiModel, TypeDescriptor};
use crate::error::{Error, Result};
use crate::framework::FrameworkHandle;
use crate::query::QueryValues;
use crate::validation::Validator;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A method bound to its controller instance: decodes, validates, invokes and
/// serializes one request.
pub type BoundHandler = Arc<dyn Fn(Invocation) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

type MethodCall<C> =
    Arc<dyn Fn(Arc<C>, Invocation) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// Everything the dispatch adapter collected for one request.
pub struct Invocation {
    pub ctx: RequestContext,
    pub method: Method,
    pub query: QueryValues,
    pub body: Bytes,
    pub validator: Arc<dyn Validator>,
}

/// A controller type whose eligible methods can be registered as routes.
///
/// Implemented by `#[controller]` on the controller's inherent `impl` block.
pub trait Controller: Send + Sync + Sized + 'static {
    fn name(&self) -> &str;

    /// Injects the framework handle and runs the `initialize` hook, if any.
    fn attach(&mut self, _handle: &FrameworkHandle) -> Result<()> {
        Ok(())
    }

    fn methods() -> Vec<MethodEntry<Self>>;
}

/// One eligible method of a controller.
pub struct MethodEntry<C> {
    pub name: &'static str,
    pub request: fn() -> &'static TypeDescriptor,
    pub response: fn() -> &'static TypeDescriptor,
    call: MethodCall<C>,
}

impl<C: Send + Sync + 'static> MethodEntry<C> {
    pub fn new<Req, Res, E, F, Fut>(name: &'static str, f: F) -> Self
    where
        Req: ApiModel + Default + Serialize + DeserializeOwned + Send + 'static,
        Res: ApiModel + Serialize + Send + 'static,
        E: Display + Send + 'static,
        F: Fn(Arc<C>, RequestContext, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Res, E>> + Send + 'static,
    {
        let call: MethodCall<C> = Arc::new(
            move |controller: Arc<C>, inv: Invocation| -> BoxFuture<'static, Result<Value>> {
                let req = match prepare::<Req>(&inv) {
                    Ok(req) => req,
                    Err(e) => return Box::pin(async move { Err(e) }),
                };
                let fut = f(controller, inv.ctx, req);
                Box::pin(async move {
                    let res = fut.await.map_err(|e| Error::Invocation(e.to_string()))?;
                    Ok(serde_json::to_value(&res)?)
                })
            },
        );
        MethodEntry {
            name,
            request: Req::descriptor,
            response: Res::descriptor,
            call,
        }
    }

    pub fn bind(&self, controller: Arc<C>) -> BoundHandler {
        let call = self.call.clone();
        Arc::new(move |inv: Invocation| call(controller.clone(), inv))
    }
}

/// Decodes the request and runs the validator on its serialized form.
fn prepare<Req>(inv: &Invocation) -> Result<Req>
where
    Req: ApiModel + Default + Serialize + DeserializeOwned,
{
    let req: Req = decode::decode(&inv.method, &inv.query, &inv.body)?;
    let data = serde_json::to_value(&req)?;
    inv.validator
        .run(&inv.ctx, &data, Req::descriptor())
        .map_err(Error::Validation)?;
    Ok(req)
}

impl<C> fmt::Debug for MethodEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("name", &self.name)
            .field("request", &(self.request)().name)
            .field("response", &(self.response)().name)
            .finish()
    }
}
