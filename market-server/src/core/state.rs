use std::sync::Arc;
use std::time::Duration;

use crate::auth::JwtService;
use crate::catalog::{CatalogGateway, DbCatalog};
use crate::checkout::CheckoutOrchestrator;
use crate::core::Config;
use crate::db::DbService;
use crate::db::repository::{OrderRepository, ProductRepository};
use crate::notify::NotifyHub;
use crate::orders::OrderLifecycle;

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 是订单核心的中枢数据结构，持有所有服务的共享引用。
/// 使用 Arc 实现浅拷贝，克隆成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | DbService | 订单存储 (SQLite) |
/// | jwt_service | Arc<JwtService> | JWT 凭证验证 |
/// | catalog | Arc<dyn CatalogGateway> | 目录网关 (只读) |
/// | checkout | CheckoutOrchestrator | 结账编排器 |
/// | lifecycle | OrderLifecycle | 订单状态机引擎 |
/// | hub | NotifyHub | 实时事件分发 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 订单存储
    pub db: DbService,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
    /// 目录网关
    pub catalog: Arc<dyn CatalogGateway>,
    /// 结账编排器
    pub checkout: CheckoutOrchestrator,
    /// 订单状态机引擎
    pub lifecycle: OrderLifecycle,
    /// 实时事件分发
    pub hub: NotifyHub,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构 (确保目录存在)
    /// 2. 数据库 (work_dir/database/market.db, 含迁移)
    /// 3. 各服务 (JWT, Catalog, NotifyHub, Checkout, Lifecycle)
    ///
    /// # Panics
    ///
    /// 数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        // 0. Ensure work_dir structure exists
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        // 1. Initialize DB
        let db_path = config.database_dir().join("market.db");
        let db = DbService::new(&db_path.to_string_lossy())
            .await
            .expect("Failed to initialize database");

        Self::with_db(config, db)
    }

    /// 基于现有数据库装配状态 (测试用内存库也走这里)
    pub fn with_db(config: &Config, db: DbService) -> Self {
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let hub = NotifyHub::new();

        let order_repo = OrderRepository::new(db.pool.clone());
        let product_repo = ProductRepository::new(db.pool.clone());
        let catalog: Arc<dyn CatalogGateway> = Arc::new(DbCatalog::new(
            product_repo,
            Duration::from_millis(config.catalog_timeout_ms),
        ));

        let checkout =
            CheckoutOrchestrator::new(catalog.clone(), order_repo.clone(), hub.clone());
        let lifecycle = OrderLifecycle::new(order_repo, hub.clone());

        Self {
            config: config.clone(),
            db,
            jwt_service,
            catalog,
            checkout,
            lifecycle,
            hub,
        }
    }

    /// 获取 JWT 服务
    pub fn jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    /// 获取事件分发 hub
    pub fn hub(&self) -> &NotifyHub {
        &self.hub
    }

    /// 订单仓库 (查询入口；所有写入走 lifecycle/checkout)
    pub fn order_repo(&self) -> OrderRepository {
        OrderRepository::new(self.db.pool.clone())
    }
}
