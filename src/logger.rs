use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 커스텀 Logger 미들웨어
/// 요청마다 request_id 를 가진 span 을 열고, 응답 상태와 처리 시간을 기록합니다.
/// 토큰이 담긴 요청 본문이나 헤더는 기록하지 않습니다.
pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(LoggerMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let span = tracing::info_span!(
            "http_request",
            request_id = %Uuid::new_v4(),
            method = %req.method(),
            path = %req.path(),
        );

        let service = self.service.clone();

        Box::pin(
            async move {
                tracing::info!("Request started");

                let res = service.call(req).await?;
                let status = res.status();

                // 응답 정보 로깅
                tracing::info!(
                    status = status.as_u16(),
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "Request completed"
                );

                Ok(res)
            }
            .instrument(span),
        )
    }
}
