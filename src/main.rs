use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fleet_ops::config::{DatabaseConfig, EnvironmentConfig, FleetConfig, StorageBackend};
use fleet_ops::database::DatabaseConnection;
use fleet_ops::repositories::Repositories;
use fleet_ops::services::SystemClock;
use fleet_ops::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging (RUST_LOG manda; por defecto info)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚛 Fleet Ops - Motor de operación de flota");
    info!("==========================================");

    let config = EnvironmentConfig::from_env()?;
    let fleet = FleetConfig::from_env()?;
    info!(
        "⚙️ Entorno: {} | radio de auto-registro: {} m",
        config.environment, fleet.auto_register_radius_m
    );

    let repos = match config.storage_backend {
        StorageBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let connection = match DatabaseConnection::connect(&db_config).await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(anyhow::anyhow!("Error de base de datos: {}", e));
                }
            };
            Repositories::postgres(connection.into_pool())
        }
        StorageBackend::Memory => {
            warn!("🧪 Almacenamiento en memoria: los datos se pierden al reiniciar");
            Repositories::in_memory()
        }
    };

    let addr: SocketAddr = config.server_url().parse()?;
    let app_state = AppState::new(config, fleet, repos, Arc::new(SystemClock));
    let app = fleet_ops::create_app(app_state);

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("🚚 Viajes:");
    info!("   POST /api/trip - Iniciar viaje");
    info!("   GET  /api/trip - Listar viajes");
    info!("   GET  /api/trip/current - Viaje en curso del chofer");
    info!("   GET  /api/trip/:id - Detalle del viaje");
    info!("   POST /api/trip/:id/activity - Registrar actividad");
    info!("   GET  /api/trip/:id/activity - Ledger de actividades");
    info!("   POST /api/trip/:id/gps - Guardar fix GPS");
    info!("   POST /api/trip/:id/gps/batch - Lote de fixes GPS");
    info!("   POST /api/trip/:id/gps/locate - Fix GPS con ubicación");
    info!("   GET  /api/trip/:id/gps - Traza GPS");
    info!("   POST /api/trip/:id/fuel - Registrar combustible");
    info!("   POST /api/trip/:id/end - Completar viaje");
    info!("   POST /api/trip/:id/cancel - Cancelar viaje");
    info!("📍 Ubicaciones:");
    info!("   POST   /api/location - Crear ubicación");
    info!("   GET    /api/location/nearby - Búsqueda por proximidad");
    info!("   GET    /api/location/search - Autocompletado");
    info!("   GET    /api/location/:id - Obtener ubicación");
    info!("   DELETE /api/location/:id - Desactivar ubicación");
    info!("🚗 Vehículos:");
    info!("   POST   /api/vehicle - Crear vehículo");
    info!("   GET    /api/vehicle/:id - Obtener vehículo");
    info!("   PUT    /api/vehicle/:id/status - Cambiar estado");
    info!("   POST   /api/vehicle/bulk-status - Cambio de estado masivo");
    info!("   DELETE /api/vehicle/:id - Retirar vehículo");
    info!("   GET    /api/vehicle/:id/stats - Estadísticas del vehículo");
    info!("📊 Estadísticas:");
    info!("   GET  /api/stats/fleet - Utilización de la flota");
    info!("   GET  /api/stats/location/:id - Cargas y descargas");
    info!("   GET  /api/stats/driver/:id - Estadísticas del chofer");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo escuchar Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo escuchar SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
