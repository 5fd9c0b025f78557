//! 集成测试共用设施
//!
//! - 加速版配置表（行程/速度按测试时长调小调快，几何范围与
//!   出厂表一致，保证运动学场景可复用）
//! - 位置式限位开关模拟器：盯着模拟固件的物理里程，跨过安装
//!   阈值就发边沿事件，天然支持回零重跑与开机压着开关的场景

// 不同测试二进制各取所需
#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use hexarm_client::{switch_channel, ArmConfig, JointConfig, Robot, SwitchEvent};
use hexarm_gateway::{DeviceIndex, Gateway, MockFirmware, MockHandle};
use hexarm_kinematics::{Joint, JointArray};

/// 初始化测试日志（重复调用无害）
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// 测试用快速配置：几何参数照抄出厂表，速度抬高到回零只需
/// 几百毫秒
pub fn fast_config() -> ArmConfig {
    let factory = ArmConfig::hexarm();
    let joints = factory.joints().clone().map(|config| JointConfig {
        max_speed: 500.0,
        max_accel: 1000.0,
        homing_speed: 400.0,
        ..config
    });
    ArmConfig::new(joints).expect("fast config must validate")
}

/// 单个关节的虚拟限位开关
///
/// 安装在物理里程 `threshold` 处：负向回零的关节在
/// `odometer <= threshold` 时压下，正向回零相反。
pub struct SwitchSimulator {
    handle: MockHandle,
    device: DeviceIndex,
    threshold: f64,
    positive: bool,
    sender: Sender<SwitchEvent>,
}

impl SwitchSimulator {
    pub fn spawn(
        handle: MockHandle,
        device: DeviceIndex,
        threshold: f64,
        positive: bool,
        sender: Sender<SwitchEvent>,
    ) {
        let simulator = SwitchSimulator {
            handle,
            device,
            threshold,
            positive,
            sender,
        };
        std::thread::spawn(move || simulator.run());
    }

    fn pressed(&self) -> bool {
        let odometer = self.handle.odometer(self.device);
        if self.positive {
            odometer >= self.threshold
        } else {
            odometer <= self.threshold
        }
    }

    fn run(self) {
        let mut was_pressed = false;
        loop {
            let pressed = self.pressed();
            if pressed != was_pressed {
                let event = if pressed {
                    SwitchEvent::Press
                } else {
                    SwitchEvent::Release
                };
                if self.sender.send(event).is_err() {
                    return;
                }
                was_pressed = pressed;
            }
            std::thread::sleep(Duration::from_micros(300));
        }
    }
}

/// 搭一台完整的模拟机器人
///
/// 每个关节的开关装在"当前位置往回零方向走 `travel_fraction` 个
/// 寻位行程"的物理位置上（H1 场景的 40% 即 `0.4`）。
pub fn mock_robot(config: ArmConfig, travel_fraction: f64) -> (Robot, MockHandle) {
    init_tracing();
    let (transport, handle) = MockFirmware::spawn();
    let gateway = Arc::new(Gateway::connect(Box::new(transport)));

    let mut senders: Vec<Sender<SwitchEvent>> = Vec::new();
    let mut receivers = Vec::new();
    for _ in 0..6 {
        let (tx, rx) = switch_channel();
        senders.push(tx);
        receivers.push(rx);
    }
    let mut receivers = receivers.into_iter();
    let switches = JointArray::new(std::array::from_fn(|_| {
        receivers.next().expect("six switch channels")
    }));

    for joint in Joint::ALL {
        let joint_config = config.joint(joint);
        let travel = joint_config
            .steps_from_deg(joint_config.homing_travel().0);
        let threshold = travel * travel_fraction;
        let positive = travel > 0.0;
        SwitchSimulator::spawn(
            handle.clone(),
            joint_config.device,
            threshold,
            positive,
            senders[joint.index()].clone(),
        );
    }
    drop(senders); // 模拟器线程各自持有克隆，通道不会关闭

    let robot = Robot::new(gateway, config, switches).expect("robot construction");
    (robot, handle)
}

/// 等待谓词成立（测试辅助）
pub fn wait_for(timeout: Duration, what: &str, predicate: impl Fn() -> bool) {
    let deadline = Instant::now() + timeout;
    while !predicate() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(1));
    }
}
