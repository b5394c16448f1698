use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tera::{Context, Tera};
use tracing::{debug, info, warn};

use crate::{
    error::{AppError, AppResult},
    models::{
        BackupCheckRecord, BackupKind, CheckRecord, HostExtInfoRecord, HostGroupRecord,
        HostRecord, Machine, NetworkedDevice, full_check,
    },
    repositories::AssetRepository,
};

use super::nagios_text::{nagios_safe, nagios_safe_filter, references_placeholder, substitute};

const TEMPLATES: [(&str, &str); 8] = [
    ("macros.cfg", include_str!("../../templates/macros.cfg")),
    ("hosts.cfg", include_str!("../../templates/hosts.cfg")),
    ("hosts_ext_info.cfg", include_str!("../../templates/hosts_ext_info.cfg")),
    ("check_templates.cfg", include_str!("../../templates/check_templates.cfg")),
    ("checks.cfg", include_str!("../../templates/checks.cfg")),
    ("backup_checks.cfg", include_str!("../../templates/backup_checks.cfg")),
    ("hardware_checks.cfg", include_str!("../../templates/hardware_checks.cfg")),
    ("service_checks.cfg", include_str!("../../templates/service_checks.cfg")),
];

/// 需要输出 hostextinfo 的操作系统类型
const EXT_INFO_OS_TYPES: [&str; 3] = ["Linux", "Windows", "Solaris"];

/// 生成的检查记录，以及因占位符无法替换而跳过的记录
#[derive(Debug, Default)]
pub struct RenderedChecks {
    pub records: Vec<CheckRecord>,
    pub failures: Vec<AppError>,
}

impl RenderedChecks {
    fn push(&mut self, record: AppResult<CheckRecord>) {
        match record {
            Ok(record) => self.records.push(record),
            Err(e) => {
                warn!(error = %e, "跳过无法生成的检查");
                self.failures.push(e);
            }
        }
    }
}

/// backup_checks.cfg 中同一类型的备份任务
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BackupCheckGroup {
    pub kind: BackupKind,
    pub tasks: Vec<BackupCheckRecord>,
}

/// Nagios 配置生成器
///
/// 只读：每次调用都重新查询资产库，不持有可变状态，可并发调用。
pub struct ConfigRenderer {
    repo: Arc<dyn AssetRepository>,
    tera: Tera,
}

impl ConfigRenderer {
    pub fn new(repo: Arc<dyn AssetRepository>) -> AppResult<Self> {
        let mut tera = Tera::default();
        tera.register_filter("nagios_safe", nagios_safe_filter);
        tera.add_raw_templates(TEMPLATES)?;
        // 输出的是 Nagios 配置，不做 HTML 转义
        tera.autoescape_on(vec![]);

        Ok(Self { repo, tera })
    }

    fn render(&self, template: &str, context: &Context) -> AppResult<String> {
        let output = self.tera.render(template, context)?;
        debug!(template, bytes = output.len(), "配置文件已生成");
        Ok(output)
    }

    /// 在线机器的 host 记录，按 fqdn 升序
    pub async fn host_records(&self) -> AppResult<Vec<HostRecord>> {
        let machines = self.repo.up_machines().await?;
        let mut records = Vec::with_capacity(machines.len());

        for machine in machines {
            let parents = self.repo.host_parents(machine.id).await?;
            records.push(HostRecord {
                service_ip: machine
                    .service_ip
                    .clone()
                    .unwrap_or_else(|| machine.fqdn.clone()),
                fqdn: machine.fqdn,
                contact_groups: machine.contact_groups,
                parents,
            });
        }

        Ok(records)
    }

    /// 每个服务一个 hostgroup，成员为服务下的在线机器
    pub async fn host_group_records(&self) -> AppResult<Vec<HostGroupRecord>> {
        let mut groups = Vec::new();

        for service in self.repo.services().await? {
            let members: Vec<String> = self
                .repo
                .service_machines(service.id)
                .await?
                .into_iter()
                .filter(|m| m.up)
                .map(|m| m.fqdn)
                .collect();

            if members.is_empty() {
                debug!(service = %service.name, "服务下没有在线机器，不生成 hostgroup");
                continue;
            }
            groups.push(HostGroupRecord {
                name: service.name,
                members,
            });
        }

        Ok(groups)
    }

    pub async fn render_hosts(&self) -> AppResult<String> {
        let hosts = self.host_records().await?;
        let hostgroups = self.host_group_records().await?;
        let devices: Vec<NetworkedDevice> = self
            .repo
            .networked_devices(None)
            .await?
            .into_iter()
            .filter(|d| d.main_ip.is_some())
            .collect();

        let mut context = Context::new();
        context.insert("hosts", &hosts);
        context.insert("hostgroups", &hostgroups);
        context.insert("devices", &devices);
        self.render("hosts.cfg", &context)
    }

    pub async fn host_ext_info_records(&self) -> AppResult<Vec<HostExtInfoRecord>> {
        let systems = self.repo.operating_systems(&EXT_INFO_OS_TYPES).await?;
        let machines = self.repo.up_machines().await?;

        let mut by_os: HashMap<i64, Vec<String>> = HashMap::new();
        for machine in machines {
            if let Some(os_id) = machine.os_id {
                by_os.entry(os_id).or_default().push(machine.fqdn);
            }
        }

        let mut records = Vec::new();
        for os in systems {
            let Some(host_names) = by_os.remove(&os.id) else {
                continue;
            };
            match os.logo {
                Some(logo) => records.push(HostExtInfoRecord { logo, host_names }),
                None => debug!(os = %os.name, "操作系统没有图标，跳过 hostextinfo"),
            }
        }

        Ok(records)
    }

    pub async fn render_host_ext_info(&self) -> AppResult<String> {
        let mut context = Context::new();
        context.insert("ext_infos", &self.host_ext_info_records().await?);
        self.render("hosts_ext_info.cfg", &context)
    }

    pub async fn render_check_templates(&self) -> AppResult<String> {
        let mut context = Context::new();
        context.insert("templates", &self.repo.check_templates().await?);
        self.render("check_templates.cfg", &context)
    }

    /// 机器级与设备级检查分配；`check_name` 为 `None` 时返回全部检查
    pub async fn check_records(&self, check_name: Option<&str>) -> AppResult<RenderedChecks> {
        let mut rendered = RenderedChecks::default();

        let machines: HashMap<i64, Machine> = self
            .repo
            .up_machines()
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

        for assignment in self.repo.machine_checks(check_name).await? {
            let command = full_check(&assignment.check.command, &assignment.options);
            let values = match machines.get(&assignment.machine_id) {
                Some(machine) => machine_values(machine),
                None => HashMap::from([("fqdn", Some(assignment.machine_fqdn.as_str()))]),
            };
            rendered.push(substitute(&command, &assignment.machine_fqdn, &values).map(
                |command| CheckRecord {
                    check_name: assignment.check.name,
                    description: assignment.check.description,
                    host_name: assignment.machine_fqdn.clone(),
                    command,
                    contact_groups: assignment.contact_groups,
                },
            ));
        }

        for assignment in self.repo.device_checks(check_name).await? {
            let command = full_check(&assignment.check.command, &assignment.options);
            let values = HashMap::from([("fqdn", Some(assignment.device_name.as_str()))]);
            rendered.push(substitute(&command, &assignment.device_name, &values).map(
                |command| CheckRecord {
                    check_name: assignment.check.name,
                    description: assignment.check.description,
                    host_name: assignment.device_name.clone(),
                    command,
                    contact_groups: assignment.contact_groups,
                },
            ));
        }

        Ok(rendered)
    }

    pub async fn render_checks(&self, check_name: &str) -> AppResult<String> {
        let rendered = self.check_records(Some(check_name)).await?;
        if rendered.records.is_empty() && rendered.failures.is_empty() {
            debug!(check = check_name, "没有分配该检查");
        }
        self.render_check_list("checks.cfg", &rendered.records)
    }

    pub async fn render_all_checks(&self) -> AppResult<String> {
        let rendered = self.check_records(None).await?;
        self.render_check_list("checks.cfg", &rendered.records)
    }

    fn render_check_list(&self, template: &str, checks: &[CheckRecord]) -> AppResult<String> {
        let mut context = Context::new();
        context.insert("checks", checks);
        self.render(template, &context)
    }

    /// 按备份类型分组的备份检查（文件级、R1Soft、TSM），组内按 fqdn 升序
    pub async fn backup_check_groups(&self) -> AppResult<Vec<BackupCheckGroup>> {
        let mut groups = Vec::with_capacity(BackupKind::all().len());

        for kind in BackupKind::all() {
            let tasks = self
                .repo
                .active_backup_tasks(Some(kind))
                .await?
                .into_iter()
                .map(|task| BackupCheckRecord {
                    task_id: task.id,
                    host_name: task.machine_fqdn,
                    description: task.description,
                })
                .collect();
            groups.push(BackupCheckGroup { kind, tasks });
        }

        Ok(groups)
    }

    pub async fn render_backup_checks(&self) -> AppResult<String> {
        let mut context = Context::new();
        context.insert("groups", &self.backup_check_groups().await?);
        self.render("backup_checks.cfg", &context)
    }

    /// 按硬件策略展开的检查。
    ///
    /// 命令引用 `management_ip` 时以管理IP判断排除，否则以机器全部IP判断；
    /// 网络设备一律使用主IP。单条记录替换失败只跳过该记录。
    pub async fn hardware_checks(&self) -> AppResult<RenderedChecks> {
        let mut rendered = RenderedChecks::default();

        for policy in self.repo.hardware_policies().await? {
            let command = policy.full_check();
            let uses_management_ip = references_placeholder(&command, "management_ip");

            for &hw_model_id in &policy.hw_model_ids {
                for machine in self.repo.physical_machines_of_model(hw_model_id).await? {
                    if machine
                        .os_id
                        .is_some_and(|os_id| policy.excluded_os_ids.contains(&os_id))
                    {
                        continue;
                    }

                    let excluded = if uses_management_ip {
                        machine
                            .management_ip
                            .as_deref()
                            .is_some_and(|ip| policy.is_ip_excluded(ip))
                    } else {
                        machine.has_any_ip_in(&policy.excluded_ips)
                    };
                    if excluded {
                        debug!(policy = policy.id, host = %machine.fqdn, "IP在排除列表中");
                        continue;
                    }

                    rendered.push(
                        substitute(&command, &machine.fqdn, &machine_values(&machine)).map(
                            |command| CheckRecord {
                                check_name: policy.check.name.clone(),
                                description: policy.check.description.clone(),
                                host_name: machine.fqdn.clone(),
                                command,
                                contact_groups: policy.contact_groups.clone(),
                            },
                        ),
                    );
                }

                for device in self.repo.networked_devices(Some(hw_model_id)).await? {
                    if device
                        .main_ip
                        .as_deref()
                        .is_some_and(|ip| policy.is_ip_excluded(ip))
                    {
                        debug!(policy = policy.id, host = %device.name, "IP在排除列表中");
                        continue;
                    }

                    rendered.push(
                        substitute(&command, &device.name, &device_values(&device)).map(
                            |command| CheckRecord {
                                check_name: policy.check.name.clone(),
                                description: policy.check.description.clone(),
                                host_name: device.name.clone(),
                                command,
                                contact_groups: policy.contact_groups.clone(),
                            },
                        ),
                    );
                }
            }
        }

        if !rendered.failures.is_empty() {
            warn!(
                generated = rendered.records.len(),
                skipped = rendered.failures.len(),
                "部分硬件检查因缺少取值被跳过"
            );
        }
        Ok(rendered)
    }

    pub async fn render_hardware_checks(&self) -> AppResult<String> {
        let rendered = self.hardware_checks().await?;
        self.render_check_list("hardware_checks.cfg", &rendered.records)
    }

    /// 服务级检查展开到服务下的在线机器。
    ///
    /// 已有同一检查的机器级配置时以机器级为准；(描述, fqdn) 相同的记录只输出一次。
    pub async fn service_check_records(&self) -> AppResult<RenderedChecks> {
        let mut rendered = RenderedChecks::default();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for service_check in self.repo.service_checks().await? {
            let command = full_check(&service_check.check.command, &service_check.options);

            for machine in self.repo.service_machines(service_check.service_id).await? {
                if !machine.up {
                    continue;
                }
                if self
                    .repo
                    .has_machine_check(machine.id, service_check.check.id)
                    .await?
                {
                    continue;
                }
                // 以输出到配置中的描述去重
                let key = (
                    nagios_safe(&service_check.check.description),
                    machine.fqdn.clone(),
                );
                if !seen.insert(key) {
                    continue;
                }

                rendered.push(
                    substitute(&command, &machine.fqdn, &machine_values(&machine)).map(
                        |command| CheckRecord {
                            check_name: service_check.check.name.clone(),
                            description: service_check.check.description.clone(),
                            host_name: machine.fqdn.clone(),
                            command,
                            contact_groups: service_check.contact_groups.clone(),
                        },
                    ),
                );
            }
        }

        info!(count = rendered.records.len(), "服务级检查已展开");
        Ok(rendered)
    }

    pub async fn render_service_checks(&self) -> AppResult<String> {
        let rendered = self.service_check_records().await?;
        self.render_check_list("service_checks.cfg", &rendered.records)
    }
}

fn machine_values(machine: &Machine) -> HashMap<&'static str, Option<&str>> {
    HashMap::from([
        ("fqdn", Some(machine.fqdn.as_str())),
        ("service_ip", machine.service_ip.as_deref()),
        ("management_ip", machine.management_ip.as_deref()),
    ])
}

/// 网络设备只有主IP，fqdn、管理IP与服务IP都取主IP
fn device_values(device: &NetworkedDevice) -> HashMap<&'static str, Option<&str>> {
    HashMap::from([
        ("fqdn", device.main_ip.as_deref()),
        ("service_ip", device.main_ip.as_deref()),
        ("management_ip", device.main_ip.as_deref()),
    ])
}
