use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 구조화된 로깅을 초기화합니다.
/// JSON 형식의 로그를 stdout으로 출력하며, RUST_LOG 환경 변수로 로그 레벨을 제어합니다.
/// 기본 레벨은 `default_filter` 입니다.
pub fn init_telemetry(default_filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .json();

    // 테스트에서 여러 번 호출될 수 있으므로 이미 설치된 경우 무시합니다.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .try_init();
}
