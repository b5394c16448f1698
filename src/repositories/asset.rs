use sqlx::{PgPool, Row, postgres::PgRow};

use super::AssetRepository;
use crate::{
    error::{AppError, AppResult},
    models::{
        BackupKind, BackupTask, CheckTemplate, DeviceCheck, HardwarePolicy, Machine,
        MachineCheck, NagiosCheck, NetworkedDevice, OperatingSystem, Service, ServiceCheck,
    },
};

/// 机器查询的公共列（IP 与联系组以数组形式带出）
const MACHINE_COLUMNS: &str = r#"
    m.id, m.fqdn, m.up, m.os_id, m.hw_model_id, m.service_ip, m.management_ip,
    ARRAY(SELECT ip.addr FROM machine_ips ip WHERE ip.machine_id = m.id ORDER BY ip.addr) AS ip_addresses,
    ARRAY(SELECT r.contact_group FROM machine_responsibles r WHERE r.machine_id = m.id ORDER BY r.contact_group) AS contact_groups
"#;

/// 检查定义的公共列
const CHECK_COLUMNS: &str = r#"
    c.id AS check_id, c.name AS check_name, c.description AS check_description, c.command AS check_command
"#;

/// Postgres 资产库
#[derive(Debug, Clone)]
pub struct PgAssetRepository {
    pool: PgPool,
}

impl PgAssetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_machines(&self, filter: &str, bind: Option<i64>) -> AppResult<Vec<Machine>> {
        let sql = format!(
            "SELECT {} FROM machines m {} ORDER BY m.fqdn ASC",
            MACHINE_COLUMNS, filter
        );
        let mut query = sqlx::query(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(machine_from_row).collect()
    }
}

fn machine_from_row(row: &PgRow) -> AppResult<Machine> {
    Ok(Machine {
        id: row.try_get("id")?,
        fqdn: row.try_get("fqdn")?,
        up: row.try_get("up")?,
        os_id: row.try_get("os_id")?,
        hw_model_id: row.try_get("hw_model_id")?,
        service_ip: row.try_get("service_ip")?,
        management_ip: row.try_get("management_ip")?,
        ip_addresses: row.try_get("ip_addresses")?,
        contact_groups: row.try_get("contact_groups")?,
    })
}

fn check_from_row(row: &PgRow) -> AppResult<NagiosCheck> {
    Ok(NagiosCheck {
        id: row.try_get("check_id")?,
        name: row.try_get("check_name")?,
        description: row.try_get("check_description")?,
        command: row.try_get("check_command")?,
    })
}

#[async_trait::async_trait]
impl AssetRepository for PgAssetRepository {
    async fn up_machines(&self) -> AppResult<Vec<Machine>> {
        self.fetch_machines("WHERE m.up = TRUE", None).await
    }

    async fn host_parents(&self, machine_id: i64) -> AppResult<Vec<String>> {
        let parents = sqlx::query_scalar::<_, String>(
            "SELECT parent_name FROM host_parents WHERE machine_id = $1 ORDER BY parent_name ASC",
        )
        .bind(machine_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(parents)
    }

    async fn services(&self) -> AppResult<Vec<Service>> {
        let rows = sqlx::query("SELECT id, name FROM services ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> AppResult<Service> {
                Ok(Service {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn service_machines(&self, service_id: i64) -> AppResult<Vec<Machine>> {
        self.fetch_machines(
            "JOIN service_machines sm ON sm.machine_id = m.id WHERE sm.service_id = $1",
            Some(service_id),
        )
        .await
    }

    async fn networked_devices(&self, hw_model_id: Option<i64>) -> AppResult<Vec<NetworkedDevice>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, hw_model_id, main_ip
            FROM networked_devices
            WHERE ($1::BIGINT IS NULL OR hw_model_id = $1)
            ORDER BY name ASC
            "#,
        )
        .bind(hw_model_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> AppResult<NetworkedDevice> {
                Ok(NetworkedDevice {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    hw_model_id: row.try_get("hw_model_id")?,
                    main_ip: row.try_get("main_ip")?,
                })
            })
            .collect()
    }

    async fn operating_systems(&self, os_types: &[&str]) -> AppResult<Vec<OperatingSystem>> {
        let os_types: Vec<String> = os_types.iter().map(|t| t.to_string()).collect();
        let rows = sqlx::query(
            "SELECT id, name, os_type, logo FROM operating_systems WHERE os_type = ANY($1) ORDER BY name ASC",
        )
        .bind(os_types)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> AppResult<OperatingSystem> {
                Ok(OperatingSystem {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    os_type: row.try_get("os_type")?,
                    logo: row.try_get("logo")?,
                })
            })
            .collect()
    }

    async fn machine_checks(&self, check_name: Option<&str>) -> AppResult<Vec<MachineCheck>> {
        let sql = format!(
            r#"
            SELECT {}, o.machine_id, m.fqdn AS machine_fqdn, o.options, o.contact_groups
            FROM machine_check_opts o
            JOIN nagios_checks c ON c.id = o.check_id
            JOIN machines m ON m.id = o.machine_id
            WHERE m.up = TRUE AND ($1::TEXT IS NULL OR c.name = $1)
            ORDER BY m.fqdn ASC, c.name ASC, o.id ASC
            "#,
            CHECK_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(check_name)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> AppResult<MachineCheck> {
                Ok(MachineCheck {
                    check: check_from_row(row)?,
                    machine_id: row.try_get("machine_id")?,
                    machine_fqdn: row.try_get("machine_fqdn")?,
                    options: row.try_get("options")?,
                    contact_groups: row.try_get("contact_groups")?,
                })
            })
            .collect()
    }

    async fn device_checks(&self, check_name: Option<&str>) -> AppResult<Vec<DeviceCheck>> {
        let sql = format!(
            r#"
            SELECT {}, o.device_id, d.name AS device_name, o.options, o.contact_groups
            FROM device_check_opts o
            JOIN nagios_checks c ON c.id = o.check_id
            JOIN networked_devices d ON d.id = o.device_id
            WHERE ($1::TEXT IS NULL OR c.name = $1)
            ORDER BY d.name ASC, c.name ASC, o.id ASC
            "#,
            CHECK_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(check_name)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> AppResult<DeviceCheck> {
                Ok(DeviceCheck {
                    check: check_from_row(row)?,
                    device_id: row.try_get("device_id")?,
                    device_name: row.try_get("device_name")?,
                    options: row.try_get("options")?,
                    contact_groups: row.try_get("contact_groups")?,
                })
            })
            .collect()
    }

    async fn has_machine_check(&self, machine_id: i64, check_id: i64) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM machine_check_opts WHERE machine_id = $1 AND check_id = $2)",
        )
        .bind(machine_id)
        .bind(check_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn service_checks(&self) -> AppResult<Vec<ServiceCheck>> {
        let sql = format!(
            r#"
            SELECT {}, o.service_id, o.options, o.contact_groups
            FROM service_check_opts o
            JOIN nagios_checks c ON c.id = o.check_id
            ORDER BY o.id ASC
            "#,
            CHECK_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> AppResult<ServiceCheck> {
                Ok(ServiceCheck {
                    check: check_from_row(row)?,
                    service_id: row.try_get("service_id")?,
                    options: row.try_get("options")?,
                    contact_groups: row.try_get("contact_groups")?,
                })
            })
            .collect()
    }

    async fn hardware_policies(&self) -> AppResult<Vec<HardwarePolicy>> {
        let sql = format!(
            r#"
            SELECT {}, p.id, p.options, p.contact_groups,
                ARRAY(SELECT pm.hw_model_id FROM hardware_policy_models pm WHERE pm.policy_id = p.id ORDER BY pm.hw_model_id) AS hw_model_ids,
                ARRAY(SELECT po.os_id FROM hardware_policy_excluded_os po WHERE po.policy_id = p.id ORDER BY po.os_id) AS excluded_os_ids,
                ARRAY(SELECT pi.addr FROM hardware_policy_excluded_ips pi WHERE pi.policy_id = p.id ORDER BY pi.addr) AS excluded_ips
            FROM hardware_policies p
            JOIN nagios_checks c ON c.id = p.check_id
            ORDER BY p.id ASC
            "#,
            CHECK_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> AppResult<HardwarePolicy> {
                Ok(HardwarePolicy {
                    id: row.try_get("id")?,
                    check: check_from_row(row)?,
                    options: row.try_get("options")?,
                    contact_groups: row.try_get("contact_groups")?,
                    hw_model_ids: row.try_get("hw_model_ids")?,
                    excluded_os_ids: row.try_get("excluded_os_ids")?,
                    excluded_ips: row.try_get("excluded_ips")?,
                })
            })
            .collect()
    }

    async fn physical_machines_of_model(&self, hw_model_id: i64) -> AppResult<Vec<Machine>> {
        self.fetch_machines("WHERE m.up = TRUE AND m.hw_model_id = $1", Some(hw_model_id))
            .await
    }

    async fn check_templates(&self) -> AppResult<Vec<CheckTemplate>> {
        let rows = sqlx::query(
            r#"
            SELECT name, base, check_period, max_check_attempts, normal_check_interval,
                   retry_check_interval, notification_interval, notification_period,
                   notification_options, contact_groups
            FROM check_templates
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> AppResult<CheckTemplate> {
                Ok(CheckTemplate {
                    name: row.try_get("name")?,
                    base: row.try_get("base")?,
                    check_period: row.try_get("check_period")?,
                    max_check_attempts: row.try_get("max_check_attempts")?,
                    normal_check_interval: row.try_get("normal_check_interval")?,
                    retry_check_interval: row.try_get("retry_check_interval")?,
                    notification_interval: row.try_get("notification_interval")?,
                    notification_period: row.try_get("notification_period")?,
                    notification_options: row.try_get("notification_options")?,
                    contact_groups: row.try_get("contact_groups")?,
                })
            })
            .collect()
    }

    async fn active_backup_tasks(&self, kind: Option<BackupKind>) -> AppResult<Vec<BackupTask>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.kind, t.machine_id, m.fqdn AS machine_fqdn, t.active, t.description
            FROM backup_tasks t
            JOIN machines m ON m.id = t.machine_id
            WHERE t.active = TRUE AND m.up = TRUE AND ($1::TEXT IS NULL OR t.kind = $1)
            ORDER BY m.fqdn ASC, t.id ASC
            "#,
        )
        .bind(kind.map(|k| k.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> AppResult<BackupTask> {
                let kind: String = row.try_get("kind")?;
                Ok(BackupTask {
                    id: row.try_get("id")?,
                    kind: kind
                        .parse()
                        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?,
                    machine_id: row.try_get("machine_id")?,
                    machine_fqdn: row.try_get("machine_fqdn")?,
                    active: row.try_get("active")?,
                    description: row.try_get("description")?,
                })
            })
            .collect()
    }
}
