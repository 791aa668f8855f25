//! Prometheus metrics plumbing shared by the status HTTP service.

use crate::CommonsError;
use actix_web::HttpResponse;
use prometheus::Registry;

/// For types that store a static Registry reference.
pub trait HasRegistry {
    /// Get the static registry reference.
    fn registry(&self) -> &'static Registry;
}

/// Minimally wraps a Registry for implementing `HasRegistry`.
pub struct RegistryWrapper(pub &'static Registry);

impl HasRegistry for RegistryWrapper {
    fn registry(&self) -> &'static Registry {
        self.0
    }
}

/// Serve metrics requests in Prometheus textual exposition format.
pub async fn serve<T>(app_data: actix_web::web::Data<T>) -> Result<HttpResponse, CommonsError>
where
    T: 'static + HasRegistry,
{
    use prometheus::Encoder;

    let metrics = app_data.registry().gather();
    let content = {
        let tenc = prometheus::TextEncoder::new();
        let mut buf = vec![];
        tenc.encode(&metrics, &mut buf)
            .map_err(|e| CommonsError::MetricEncoding(e.to_string()))?;
        buf
    };

    Ok(HttpResponse::Ok().body(content))
}

/// Create a custom Prometheus registry under an optional metric prefix.
pub fn new_registry(prefix: Option<String>) -> Result<Registry, CommonsError> {
    Registry::new_custom(prefix.clone(), None)
        .map_err(|e| CommonsError::MetricRegistration(format!("prefix {:?}: {}", prefix, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn serve_metrics_basic() {
        testing::init_logger();

        let metrics_prefix = "jobhub";
        let registry_wrapped = RegistryWrapper(Box::leak(Box::new(
            new_registry(Some(metrics_prefix.to_string())).unwrap(),
        )));

        testing::dummy_gauge(registry_wrapped.0, 42.0).unwrap();

        let resp = serve::<RegistryWrapper>(actix_web::web::Data::new(registry_wrapped))
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        assert!(!bytes.is_empty());
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains(&format!("{}_dummy_gauge 42", metrics_prefix)));
    }
}
