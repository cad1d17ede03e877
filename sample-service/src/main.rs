use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use cloud_commons::config::{ConfigLoader, DEFAULT_CONFIG_PATH};
use cloud_commons::loadbalancer::{
    load_balancer_interceptor, LoadBalancedHttpClient, LoadBalancerClient,
    LoadBalancerRequestFactory, ReqwestTransport, RoundRobinChooser,
};
use cloud_commons::service::{shutdown_signal, SHUTDOWN_HOOKS};
use cloud_commons::service_discovery::{discovery_client, DiscoveryClient};
use cloud_commons::service_register_center::{
    AutoServiceRegistration, InMemoryServiceRegistry, WebServerInitializedEvent,
};

/// 演示服务：自动注册 + 负载均衡调用
#[derive(Parser, Debug)]
#[command(name = "sample-service")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// 监听端口，0 表示由系统分配
    #[arg(short, long, default_value_t = 0)]
    port: u16,
}

#[derive(Clone)]
struct AppState {
    discovery: Arc<dyn DiscoveryClient>,
    http_client: LoadBalancedHttpClient,
}

#[derive(Serialize)]
struct CallResult {
    service: String,
    status: u16,
    body: String,
}

async fn health() -> &'static str {
    "OK"
}

async fn services(State(state): State<AppState>) -> Result<Json<Vec<String>>, (StatusCode, String)> {
    state
        .discovery
        .get_services()
        .await
        .map(Json)
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
}

/// 通过逻辑服务名调用目标服务的健康检查接口
async fn call(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Result<Json<CallResult>, (StatusCode, String)> {
    let uri = format!("http://{}/health", service);
    match state.http_client.get(&uri).await {
        Ok(response) => Ok(Json(CallResult {
            service,
            status: response.status().as_u16(),
            body: String::from_utf8_lossy(response.body()).into_owned(),
        })),
        Err(e) => {
            error!("调用服务 {} 失败: {}", service, e);
            Err((StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化全局配置
    let config = ConfigLoader::init_global(Some(args.config.as_str()))?;

    // 初始化日志
    cloud_commons::logging::init_from_config(&config)?;
    info!("正在启动 {} ...", config.service_name());

    // 注册中心，同时作为服务发现提供者
    let registry = Arc::new(InMemoryServiceRegistry::new());
    let providers: Vec<Arc<dyn DiscoveryClient>> = vec![registry.clone()];
    let discovery = discovery_client(&config.discovery, providers);
    info!("服务发现客户端: {}", discovery.description());

    // 负载均衡HTTP客户端
    let client = LoadBalancerClient::new(Arc::new(RoundRobinChooser::new(discovery.clone())));
    let interceptor = load_balancer_interceptor(
        Arc::new(config.loadbalancer.retry.clone()),
        client,
        LoadBalancerRequestFactory::default(),
    );
    let http_client = LoadBalancedHttpClient::new(Arc::new(ReqwestTransport::default()), interceptor);

    // 自动注册，进程关闭前注销
    let registration = Arc::new(AutoServiceRegistration::new(registry, config.clone()));
    SHUTDOWN_HOOKS.register(registration.clone());
    let (event_tx, event_rx) = mpsc::channel(4);
    let listener_task = registration.clone().listen(event_rx);

    let router = Router::new()
        .route("/health", get(health))
        .route("/services", get(services))
        .route("/call/{service}", get(call))
        .with_state(AppState {
            discovery,
            http_client,
        });

    let addr = format!("{}:{}", config.application.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;
    info!("服务启动，监听地址: {}", local_addr);

    // 监听器就绪，触发注册
    event_tx
        .send(WebServerInitializedEvent::new(local_addr.port()))
        .await?;

    // 设置关闭通道
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let shutdown_signal_task =
        tokio::spawn(async move { shutdown_signal(shutdown_tx, &SHUTDOWN_HOOKS).await });

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
            info!("接收到关闭信号，HTTP服务准备关闭");
        })
        .await?;
    info!("HTTP服务已关闭");

    // 等待关闭信号处理完成
    shutdown_signal_task.await??;
    drop(event_tx);
    let _ = listener_task.await;

    info!("服务已完全关闭");
    Ok(())
}
