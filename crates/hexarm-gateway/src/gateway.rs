//! Firmware Gateway
//!
//! 对上层暴露 AccelStepper 的全部八个操作；对下把所有线缆 IO
//! 序列化到一条后台线程。运动命令返回 [`Completion`] 句柄，解析
//! 值是微控制器回报的绝对步数。
//!
//! # 并发契约
//!
//! - 网关自身可被任意多线程共享（`&self` 方法 + `Arc`）。
//! - 同一设备同时至多一条在途运动命令由上层保证（关节控制器的
//!   命令互斥锁），网关不做强制。
//! - 传输层故障是进程级终态：所有挂起句柄立刻以
//!   [`GatewayError::Down`] 解决，并向订阅者广播
//!   [`GatewayEvent::Down`]，网关不重试。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use hexarm_protocol::{Command, DeviceIndex};
use parking_lot::Mutex;
use tracing::info;

use crate::completion::Completion;
use crate::error::{GatewayError, GatewayEvent, Result};
use crate::pipeline::{io_loop, Request};
use crate::transport::Transport;

/// 回报钩子：每次收到某设备的回报（完成或位置）时在 IO 线程上
/// 调用，参数为回报类别和绝对步数
///
/// 关节控制器靠它在即发即弃的流式重定目标下仍然跟踪
/// `last_known_angle`。钩子不得阻塞。
pub type ReplyHook = Box<dyn Fn(hexarm_protocol::ReplyKind, i32) + Send + Sync>;

/// IO 线程与网关句柄共享的状态
#[derive(Default)]
pub(crate) struct Shared {
    /// 传输层是否已故障
    pub(crate) down: AtomicBool,
    /// 全局事件订阅者
    pub(crate) subscribers: Mutex<Vec<Sender<GatewayEvent>>>,
    /// 每设备回报钩子
    pub(crate) hooks: Mutex<[Option<ReplyHook>; hexarm_protocol::MAX_DEVICES as usize]>,
}

/// Firmware Gateway
pub struct Gateway {
    cmd_tx: Sender<Request>,
    shared: Arc<Shared>,
    io_thread: Option<JoinHandle<()>>,
}

impl Gateway {
    /// 接管一个传输层并启动 IO 线程
    pub fn connect(transport: Box<dyn Transport>) -> Self {
        let (cmd_tx, cmd_rx) = bounded(64);
        let shared = Arc::new(Shared::default());
        let io_shared = Arc::clone(&shared);
        let io_thread = std::thread::spawn(move || io_loop(transport, cmd_rx, io_shared));
        info!("gateway IO thread started");
        Gateway {
            cmd_tx,
            shared,
            io_thread: Some(io_thread),
        }
    }

    /// 一次性配置：设备号 + STEP/DIR 引脚
    pub fn configure_stepper(&self, device: DeviceIndex, step_pin: u8, dir_pin: u8) -> Result<()> {
        self.submit(
            Command::Configure {
                device,
                step_pin,
                dir_pin,
            },
            None,
        )
    }

    /// 设置最大速度（steps/s），即发即弃
    pub fn set_speed(&self, device: DeviceIndex, steps_per_s: f64) -> Result<()> {
        self.submit(
            Command::SetSpeed {
                device,
                steps_per_s,
            },
            None,
        )
    }

    /// 设置加速度（steps/s²），即发即弃；0 = 恒速
    pub fn set_acceleration(&self, device: DeviceIndex, steps_per_s2: f64) -> Result<()> {
        self.submit(
            Command::SetAcceleration {
                device,
                steps_per_s2,
            },
            None,
        )
    }

    /// 相对步进
    ///
    /// `steps = 0` 依然产生完成回报——这是 `stop()` 流程依赖的
    /// 栅栏原语。
    pub fn step_relative(&self, device: DeviceIndex, steps: i32) -> Result<Completion> {
        let (tx, rx) = bounded(1);
        self.submit(Command::StepRelative { device, steps }, Some(tx))?;
        Ok(Completion::new(rx))
    }

    /// 绝对步进；运动中重发会被固件平滑重定目标
    pub fn step_to(&self, device: DeviceIndex, position: i32) -> Result<Completion> {
        let (tx, rx) = bounded(1);
        self.submit(Command::StepTo { device, position }, Some(tx))?;
        Ok(Completion::new(rx))
    }

    /// 立即停止
    ///
    /// 在途运动不会收到完成回报；其句柄由随后的零步栅栏代为
    /// 解决（见关节控制器的 stop 流程）。
    pub fn stop(&self, device: DeviceIndex) -> Result<()> {
        self.submit(Command::Stop { device }, None)
    }

    /// 查询绝对位置
    pub fn report_position(&self, device: DeviceIndex) -> Result<Completion> {
        let (tx, rx) = bounded(1);
        self.submit(Command::ReportPosition { device }, Some(tx))?;
        Ok(Completion::new(rx))
    }

    /// 把微控制器侧绝对计数器清零
    pub fn zero(&self, device: DeviceIndex) -> Result<()> {
        self.submit(Command::Zero { device }, None)
    }

    /// 传输层是否已故障
    pub fn is_down(&self) -> bool {
        self.shared.down.load(Ordering::SeqCst)
    }

    /// 注册某设备的回报钩子（覆盖旧钩子）
    pub fn set_reply_hook(&self, device: DeviceIndex, hook: ReplyHook) {
        self.shared.hooks.lock()[device.index()] = Some(hook);
    }

    /// 订阅全局事件
    ///
    /// 若订阅时网关已下线，事件会立即补发一次。
    pub fn events(&self) -> Receiver<GatewayEvent> {
        let (tx, rx) = unbounded();
        if self.is_down() {
            let _ = tx.send(GatewayEvent::Down);
        }
        self.shared.subscribers.lock().push(tx);
        rx
    }

    fn submit(&self, command: Command, completion: Option<Sender<Result<i32>>>) -> Result<()> {
        if self.is_down() {
            return Err(GatewayError::Down);
        }
        self.cmd_tx
            .send(Request::Wire {
                command,
                completion,
            })
            .map_err(|_| GatewayError::Down)
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(Request::Shutdown);
        if let Some(handle) = self.io_thread.take() {
            let _ = handle.join();
        }
    }
}
