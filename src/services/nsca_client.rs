//! NSCA v3 被动检查提交客户端（send_nsca 的协议子集）。
//!
//! 连接建立后服务端先发送 132 字节的初始化包（128 字节 IV + 时间戳），
//! 之后每条结果编码为 720 字节的数据包，按配置的方式加密后一次性写出。

use bytes::{Buf, BufMut, BytesMut};
use rand::Rng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::{
    config::{NscaConfig, NscaEncryption},
    error::{AppError, AppResult},
    models::NagiosState,
};

const PACKET_VERSION: i16 = 3;
const IV_SIZE: usize = 128;
const INIT_PACKET_SIZE: usize = IV_SIZE + 4;
const MAX_HOSTNAME_LENGTH: usize = 64;
const MAX_DESCRIPTION_LENGTH: usize = 128;
const MAX_PLUGINOUTPUT_LENGTH: usize = 512;
/// version(2) + padding(2) + crc32(4) + timestamp(4) + return_code(2) + 字符串字段 + padding(2)
pub const DATA_PACKET_SIZE: usize =
    16 + MAX_HOSTNAME_LENGTH + MAX_DESCRIPTION_LENGTH + MAX_PLUGINOUTPUT_LENGTH;
const CRC_OFFSET: usize = 4;

/// 一条待提交的被动检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassiveCheckResult {
    pub host_name: String,
    pub description: String,
    pub state: NagiosState,
    pub output: String,
}

/// 被动检查结果的发送通道。
///
/// 生命周期：`open` → 若干次 `submit` → `flush`。一个实例只服务一次同步，
/// `flush` 之后连接即关闭，不跨次复用。
#[async_trait::async_trait]
pub trait StatusRelay: Send {
    /// 建立到监控主机的连接，失败时返回 `Connection`
    async fn open(&mut self) -> AppResult<()>;

    /// 缓存一条结果，不产生网络交互
    fn submit(
        &mut self,
        host_name: &str,
        description: &str,
        state: NagiosState,
        message: &str,
    ) -> AppResult<()>;

    /// 一次性发送全部缓存结果，失败时返回 `Relay`，不做部分重试
    async fn flush(&mut self) -> AppResult<usize>;
}

/// 每次同步创建一个新的发送通道
pub trait RelayFactory: Send + Sync {
    fn create(&self) -> Box<dyn StatusRelay>;
}

struct NscaSession {
    stream: TcpStream,
    iv: [u8; IV_SIZE],
    timestamp: u32,
}

/// NSCA 客户端
pub struct NscaClient {
    config: NscaConfig,
    session: Option<NscaSession>,
    pending: Vec<PassiveCheckResult>,
}

impl NscaClient {
    pub fn new(config: NscaConfig) -> Self {
        Self {
            config,
            session: None,
            pending: Vec::new(),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[async_trait::async_trait]
impl StatusRelay for NscaClient {
    async fn open(&mut self) -> AppResult<()> {
        let addr = self.config.addr();
        debug!(%addr, "连接NSCA服务端");

        let mut stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| AppError::connection(format!("{}: {}", addr, e)))?;

        let mut init = [0u8; INIT_PACKET_SIZE];
        stream
            .read_exact(&mut init)
            .await
            .map_err(|e| AppError::connection(format!("读取NSCA初始化包失败 {}: {}", addr, e)))?;

        let mut cursor = &init[..];
        let mut iv = [0u8; IV_SIZE];
        cursor.copy_to_slice(&mut iv);
        let timestamp = cursor.get_u32();

        self.session = Some(NscaSession {
            stream,
            iv,
            timestamp,
        });
        self.pending.clear();
        info!(%addr, timestamp, "NSCA连接已建立");
        Ok(())
    }

    fn submit(
        &mut self,
        host_name: &str,
        description: &str,
        state: NagiosState,
        message: &str,
    ) -> AppResult<()> {
        if self.session.is_none() {
            return Err(AppError::relay("NSCA连接尚未建立"));
        }
        self.pending.push(PassiveCheckResult {
            host_name: host_name.to_string(),
            description: description.to_string(),
            state,
            output: message.to_string(),
        });
        Ok(())
    }

    async fn flush(&mut self) -> AppResult<usize> {
        let mut session = self
            .session
            .take()
            .ok_or_else(|| AppError::relay("NSCA连接尚未建立"))?;
        let results = std::mem::take(&mut self.pending);

        let mut payload = BytesMut::with_capacity(results.len() * DATA_PACKET_SIZE);
        for result in &results {
            let mut packet = encode_packet(result, session.timestamp);
            encrypt(
                &mut packet,
                self.config.encryption,
                &session.iv,
                self.config.password.as_bytes(),
            );
            payload.extend_from_slice(&packet);
        }

        let write = async {
            session.stream.write_all(&payload).await?;
            session.stream.flush().await?;
            session.stream.shutdown().await
        };
        write
            .await
            .map_err(|e| AppError::relay(format!("写入NSCA数据包失败: {}", e)))?;

        info!(count = results.len(), "被动检查结果已发送");
        Ok(results.len())
    }
}

/// 按配置创建 [`NscaClient`]
pub struct NscaRelayFactory {
    config: NscaConfig,
}

impl NscaRelayFactory {
    pub fn new(config: NscaConfig) -> Self {
        Self { config }
    }
}

impl RelayFactory for NscaRelayFactory {
    fn create(&self) -> Box<dyn StatusRelay> {
        Box::new(NscaClient::new(self.config.clone()))
    }
}

/// 编码一个未加密的数据包，CRC32 在 CRC 字段置零时计算
pub fn encode_packet(result: &PassiveCheckResult, timestamp: u32) -> BytesMut {
    let mut filler = [0u8; 4];
    rand::rng().fill(&mut filler[..]);

    let mut packet = BytesMut::with_capacity(DATA_PACKET_SIZE);
    packet.put_i16(PACKET_VERSION);
    packet.put_slice(&filler[..2]);
    packet.put_u32(0);
    packet.put_u32(timestamp);
    packet.put_i16(result.state.code());
    put_field(&mut packet, &result.host_name, MAX_HOSTNAME_LENGTH);
    put_field(&mut packet, &result.description, MAX_DESCRIPTION_LENGTH);
    put_field(&mut packet, &result.output, MAX_PLUGINOUTPUT_LENGTH);
    packet.put_slice(&filler[2..]);

    let crc = crc32fast::hash(&packet);
    packet[CRC_OFFSET..CRC_OFFSET + 4].copy_from_slice(&crc.to_be_bytes());
    packet
}

/// 定长字段：超长截断，保证以 NUL 结尾，剩余补零
fn put_field(packet: &mut BytesMut, value: &str, size: usize) {
    let value = truncate_at_char_boundary(value, size - 1);
    packet.put_slice(value.as_bytes());
    packet.put_bytes(0, size - value.len());
}

fn truncate_at_char_boundary(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// 方法 1：先与 IV 异或，再与口令异或
fn encrypt(packet: &mut [u8], encryption: NscaEncryption, iv: &[u8], password: &[u8]) {
    if encryption == NscaEncryption::None {
        return;
    }
    for (i, byte) in packet.iter_mut().enumerate() {
        *byte ^= iv[i % iv.len()];
    }
    if password.is_empty() {
        return;
    }
    for (i, byte) in packet.iter_mut().enumerate() {
        *byte ^= password[i % password.len()];
    }
}
