//! 模拟微控制器
//!
//! 不接硬件跑整条控制链路：`MockTransport` 实现 [`Transport`]，
//! 背后一条固件线程解析 AccelStepper 命令并按设定速度匀速积分
//! 六个设备的位置，产生与真实固件一致的完成/位置回报。
//!
//! 行为要点（对齐 AccelStepper 固件）：
//!
//! - 一次排空的运动队列只回报一次 `MOVE_COMPLETE`
//! - `STOP` 立即停住且**不**回报
//! - 零步命令立即以当前位置回报（栅栏）
//! - 运动中重发 `TO` 平滑重定目标，只在最终停住时回报一次
//!
//! 加速度只记录不模拟（匀速模型足够覆盖宿主侧逻辑）。

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use hexarm_protocol::codec::{decode_i32, decode_unit_float};
use hexarm_protocol::ids::*;
use hexarm_protocol::{encode_i32, DeviceIndex, MAX_DEVICES};
use parking_lot::Mutex;

use crate::transport::Transport;

/// 单个模拟设备的状态
#[derive(Debug, Clone)]
pub struct DeviceState {
    /// 当前绝对位置（步，连续量；`ZERO` 会把它清零）
    pub position: f64,
    /// 物理里程（步，`ZERO` 不影响——模拟限位开关等"真实世界"
    /// 参照用）
    pub odometer: f64,
    /// 当前目标；`None` 表示静止
    pub target: Option<f64>,
    /// 最近一次 SET_SPEED 的值（steps/s）
    pub speed: f64,
    /// 最近一次 SET_ACCELERATION 的值（steps/s²）
    pub acceleration: f64,
    /// 是否已收到 CONFIG
    pub configured: bool,
    /// 收到的 TO 命令计数
    pub to_commands: u32,
    /// 收到的 STEP 命令计数
    pub step_commands: u32,
}

impl Default for DeviceState {
    fn default() -> Self {
        DeviceState {
            position: 0.0,
            odometer: 0.0,
            target: None,
            speed: 1000.0,
            acceleration: 0.0,
            configured: false,
            to_commands: 0,
            step_commands: 0,
        }
    }
}

/// 测试侧的观察句柄
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<[DeviceState; MAX_DEVICES as usize]>>,
    failed: Arc<AtomicBool>,
}

impl MockHandle {
    /// 读取设备状态快照
    pub fn device(&self, device: DeviceIndex) -> DeviceState {
        self.state.lock()[device.index()].clone()
    }

    /// 当前位置（步）
    pub fn position(&self, device: DeviceIndex) -> f64 {
        self.state.lock()[device.index()].position
    }

    /// 物理里程（步，不受 ZERO 影响）
    pub fn odometer(&self, device: DeviceIndex) -> f64 {
        self.state.lock()[device.index()].odometer
    }

    /// 是否在运动
    pub fn is_moving(&self, device: DeviceIndex) -> bool {
        self.state.lock()[device.index()].target.is_some()
    }

    /// 阻塞等待设备开始运动（测试辅助，2 秒超时）
    pub fn wait_until_moving(&self, device: DeviceIndex) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !self.is_moving(device) {
            assert!(
                Instant::now() < deadline,
                "{} never started moving",
                device
            );
            std::thread::sleep(Duration::from_micros(200));
        }
    }

    /// 阻塞等待位置越过阈值（测试辅助，5 秒超时）
    pub fn wait_until_position(&self, device: DeviceIndex, predicate: impl Fn(f64) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !predicate(self.position(device)) {
            assert!(
                Instant::now() < deadline,
                "{} never reached expected position (at {})",
                device,
                self.position(device)
            );
            std::thread::sleep(Duration::from_micros(200));
        }
    }

    /// 注入传输层故障
    pub fn fail_transport(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }
}

/// 模拟传输层（主机侧）
pub struct MockTransport {
    to_firmware: Sender<Vec<u8>>,
    from_firmware: Receiver<Vec<u8>>,
    failed: Arc<AtomicBool>,
}

impl Transport for MockTransport {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.failed.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock transport failed"));
        }
        self.to_firmware
            .send(bytes.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "mock firmware gone"))
    }

    fn recv_timeout(&mut self, timeout: Duration) -> io::Result<Option<Vec<u8>>> {
        if self.failed.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock transport failed"));
        }
        match self.from_firmware.recv_timeout(timeout) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock firmware gone"))
            },
        }
    }
}

/// 模拟固件
pub struct MockFirmware;

impl MockFirmware {
    /// 启动固件线程，返回主机侧传输层和观察句柄
    pub fn spawn() -> (MockTransport, MockHandle) {
        let (to_firmware, commands) = unbounded::<Vec<u8>>();
        let (replies, from_firmware) = unbounded::<Vec<u8>>();
        let state = Arc::new(Mutex::new(std::array::from_fn(|_| DeviceState::default())));
        let failed = Arc::new(AtomicBool::new(false));

        let thread_state = Arc::clone(&state);
        std::thread::spawn(move || firmware_loop(commands, replies, thread_state));

        (
            MockTransport {
                to_firmware,
                from_firmware,
                failed: Arc::clone(&failed),
            },
            MockHandle { state, failed },
        )
    }
}

fn firmware_loop(
    commands: Receiver<Vec<u8>>,
    replies: Sender<Vec<u8>>,
    state: Arc<Mutex<[DeviceState; MAX_DEVICES as usize]>>,
) {
    let mut last_tick = Instant::now();
    loop {
        match commands.recv_timeout(Duration::from_micros(500)) {
            Ok(frame) => {
                if handle_frame(&frame, &state, &replies).is_err() {
                    return;
                }
            },
            Err(RecvTimeoutError::Timeout) => {},
            // 主机侧传输层已析构
            Err(RecvTimeoutError::Disconnected) => return,
        }

        let now = Instant::now();
        let dt = now.duration_since(last_tick).as_secs_f64();
        last_tick = now;
        if advance(dt, &state, &replies).is_err() {
            return;
        }
    }
}

/// 匀速积分：把每个在动设备朝目标推进，到位则回报
fn advance(
    dt: f64,
    state: &Mutex<[DeviceState; MAX_DEVICES as usize]>,
    replies: &Sender<Vec<u8>>,
) -> Result<(), ()> {
    let mut done: Vec<(u8, i32)> = Vec::new();
    {
        let mut devices = state.lock();
        for (index, dev) in devices.iter_mut().enumerate() {
            let Some(target) = dev.target else { continue };
            let distance = target - dev.position;
            let step = dev.speed.abs() * dt;
            let applied = if distance.abs() <= step {
                dev.position = target;
                dev.target = None;
                done.push((index as u8, target.round() as i32));
                distance
            } else {
                let delta = step * distance.signum();
                dev.position += delta;
                delta
            };
            dev.odometer += applied;
        }
    }
    for (device, position) in done {
        send_reply(replies, STEPPER_MOVE_COMPLETE, device, position)?;
    }
    Ok(())
}

fn handle_frame(
    frame: &[u8],
    state: &Mutex<[DeviceState; MAX_DEVICES as usize]>,
    replies: &Sender<Vec<u8>>,
) -> Result<(), ()> {
    // 期望完整 sysex 帧：F0 62 <sub> <payload…> F7
    let Some(payload) = frame
        .strip_prefix(&[START_SYSEX, ACCELSTEPPER_DATA])
        .and_then(|rest| rest.strip_suffix(&[END_SYSEX]))
    else {
        return Ok(());
    };
    let Some((&subcommand, rest)) = payload.split_first() else {
        return Ok(());
    };
    let Some((&device, args)) = rest.split_first() else {
        return Ok(());
    };
    let index = device as usize;
    if index >= MAX_DEVICES as usize {
        return Ok(());
    }

    // 回报在释放锁之后发送
    let mut reply: Option<(u8, u8, i32)> = None;
    {
        let mut devices = state.lock();
        let dev = &mut devices[index];
        match subcommand {
            STEPPER_CONFIG => dev.configured = true,
            STEPPER_ZERO => {
                dev.position = 0.0;
                dev.target = None;
            },
            STEPPER_STEP => {
                if let Ok(steps) = decode_i32(args) {
                    dev.step_commands += 1;
                    if steps == 0 {
                        // 栅栏：立即回报当前的位置，不进入运动状态
                        dev.target = None;
                        reply = Some((STEPPER_MOVE_COMPLETE, device, dev.position.round() as i32));
                    } else {
                        dev.target = Some(dev.position + steps as f64);
                    }
                }
            },
            STEPPER_TO => {
                if let Ok(position) = decode_i32(args) {
                    dev.to_commands += 1;
                    if (position as f64 - dev.position).abs() < 0.5 {
                        dev.target = None;
                        reply = Some((STEPPER_MOVE_COMPLETE, device, dev.position.round() as i32));
                    } else {
                        dev.target = Some(position as f64);
                    }
                }
            },
            STEPPER_STOP => dev.target = None,
            STEPPER_REPORT_POSITION => {
                reply = Some((STEPPER_REPORT_POSITION, device, dev.position.round() as i32));
            },
            STEPPER_SET_SPEED => {
                if let Ok(speed) = decode_unit_float(args) {
                    dev.speed = speed;
                }
            },
            STEPPER_SET_ACCELERATION => {
                if let Ok(acceleration) = decode_unit_float(args) {
                    dev.acceleration = acceleration;
                }
            },
            _ => {},
        }
    }

    if let Some((kind, device, position)) = reply {
        send_reply(replies, kind, device, position)?;
    }
    Ok(())
}

fn send_reply(
    replies: &Sender<Vec<u8>>,
    kind: u8,
    device: u8,
    position: i32,
) -> Result<(), ()> {
    let mut frame = vec![START_SYSEX, ACCELSTEPPER_DATA, kind, device];
    frame.extend_from_slice(&encode_i32(position));
    frame.push(END_SYSEX);
    replies.send(frame).map_err(|_| ())
}
