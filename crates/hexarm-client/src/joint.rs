//! 关节控制器
//!
//! 每个关节一台：捆绑一个步进设备、一个限位开关、角度范围、
//! 标定参数和回零状态机。所有运动都走"命令 + 完成回报"：
//! `last_known_angle` 只从微控制器回报的整数步数反算，宿主侧
//! 不做开环累计。
//!
//! # 状态更新路径
//!
//! - 网关回报钩子（IO 线程）：每个完成/位置回报 → 更新
//!   `last_known_angle`，即发即弃的流式重定目标也不漏
//! - 限位开关监听线程：压下 → 置位 `home_switch_active` 并立即
//!   `stop()`；松开 → 清位。这是硬件打断运动的唯一路径
//! - 调用方线程：速度/加速度、homed/is_homing 标志
//!
//! # stop 流程
//!
//! AccelStepper 在 stop 之后保留斜坡状态，下一条运动会带着旧的
//! 减速残余起步。流程固定为：stop → 保存加速度 → 加速度清零 →
//! 零步栅栏排空完成队列 → 恢复加速度，保证下一条运动从已知的
//! 运动学状态出发。

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use crossbeam_channel::Receiver;
use hexarm_gateway::Gateway;
use hexarm_kinematics::{Deg, Joint};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::JointConfig;
use crate::error::{ArmError, Result};
use crate::switch::SwitchEvent;

/// 回零自检的最大退避次数（开机压在开关上的场合）
const PRECHECK_BACKOFF_LIMIT: u8 = 3;

/// 回零退避角
const PRECHECK_BACKOFF: Deg = Deg(15.0);

/// 触碰开关后的机械稳定时间
const SETTLE: Duration = Duration::from_millis(500);

/// 关节可变状态快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointState {
    /// 已成功回零
    pub homed: bool,
    /// 回零状态机运行中（范围检查旁路）
    pub is_homing: bool,
    /// 限位开关当前压下
    pub home_switch_active: bool,
    /// 最近一次下发的速度（deg/s）
    pub current_speed: f64,
    /// 最近一次下发的加速度（deg/s²）
    pub current_accel: f64,
    /// 最近一次回报反算出的角度
    pub last_known_angle: Deg,
}

struct JointInner {
    config: JointConfig,
    gateway: Arc<Gateway>,
    state: ArcSwap<JointState>,
    /// stop 流程互斥：开关事件线程和 halt() 可能并发触发
    stop_lock: Mutex<()>,
}

/// 关节控制器
///
/// 可廉价克隆（内部 `Arc`），跨线程共享；"每设备至多一条在途
/// 运动"由调用方遵守（协调器序列化每关节的运动命令）。
#[derive(Clone)]
pub struct JointController {
    inner: Arc<JointInner>,
}

impl JointController {
    /// 构造并初始化设备
    ///
    /// 一次性下发 CONFIG，并把速度/加速度设到配置上限；随后在
    /// 网关注册回报钩子、挂上限位开关监听线程。
    pub fn new(
        config: JointConfig,
        gateway: Arc<Gateway>,
        switch_events: Receiver<SwitchEvent>,
    ) -> Result<Self> {
        config.validate()?;
        let device = config.device;
        gateway.configure_stepper(device, config.step_pin, config.dir_pin)?;

        let initial = JointState {
            homed: false,
            is_homing: false,
            home_switch_active: false,
            current_speed: 0.0,
            current_accel: 0.0,
            last_known_angle: Deg::ZERO,
        };
        let inner = Arc::new(JointInner {
            config,
            gateway: Arc::clone(&gateway),
            state: ArcSwap::from_pointee(initial),
            stop_lock: Mutex::new(()),
        });
        let controller = JointController { inner };

        // 回报钩子：所有完成/位置回报都更新 last_known_angle
        let hook_inner = Arc::clone(&controller.inner);
        gateway.set_reply_hook(
            device,
            Box::new(move |_, position| {
                let angle = hook_inner.config.deg_from_steps(position);
                hook_inner.state.rcu(|state| JointState {
                    last_known_angle: angle,
                    ..**state
                });
            }),
        );

        // 限位开关监听线程
        let switch_inner = Arc::clone(&controller.inner);
        std::thread::spawn(move || switch_loop(switch_inner, switch_events));

        controller.set_speed(controller.inner.config.max_speed)?;
        controller.set_acceleration(controller.inner.config.max_accel)?;
        Ok(controller)
    }

    /// 关节名
    pub fn name(&self) -> Joint {
        self.inner.config.name
    }

    /// 配置表
    pub fn config(&self) -> &JointConfig {
        &self.inner.config
    }

    /// 状态快照
    pub fn state(&self) -> JointState {
        **self.inner.state.load()
    }

    /// 最近一次回报反算出的角度
    pub fn last_known_angle(&self) -> Deg {
        self.state().last_known_angle
    }

    /// 设置速度（deg/s）
    pub fn set_speed(&self, deg_per_s: f64) -> Result<()> {
        let config = &self.inner.config;
        self.inner
            .gateway
            .set_speed(config.device, config.steps_from_deg(deg_per_s))?;
        self.inner.state.rcu(|state| JointState {
            current_speed: deg_per_s,
            ..**state
        });
        Ok(())
    }

    /// 设置加速度（deg/s²）；0 = 恒速
    pub fn set_acceleration(&self, deg_per_s2: f64) -> Result<()> {
        let config = &self.inner.config;
        self.inner
            .gateway
            .set_acceleration(config.device, config.steps_from_deg(deg_per_s2))?;
        self.inner.state.rcu(|state| JointState {
            current_accel: deg_per_s2,
            ..**state
        });
        Ok(())
    }

    /// 相对转动
    ///
    /// `delta = 0` 是纯栅栏：跳过回零/范围检查，只排空完成队列。
    /// 返回 `true` 当且仅当回报角度与命令目标相差不超过一步。
    pub fn rotate_by(&self, delta: Deg) -> Result<bool> {
        let config = &self.inner.config;
        if delta == Deg::ZERO {
            let completion = self.inner.gateway.step_relative(config.device, 0)?;
            completion.wait()?;
            return Ok(true);
        }

        let state = self.state();
        if !state.is_homing {
            self.require_homed(&state)?;
            self.require_in_range(state.last_known_angle + delta)?;
        }

        let target = state.last_known_angle + delta;
        let steps = config.steps_from_deg(delta.0).round() as i32;
        let completion = self.inner.gateway.step_relative(config.device, steps)?;
        let reported = config.deg_from_steps(completion.wait()?);
        Ok((reported - target).abs().0 <= config.one_step_deg().0)
    }

    /// 转动到绝对角度
    pub fn rotate_to(&self, target: Deg) -> Result<bool> {
        let state = self.state();
        if !state.is_homing {
            self.require_homed(&state)?;
            self.require_in_range(target)?;
        }
        let completion = self.issue_step_to(target)?;
        let reported = self.inner.config.deg_from_steps(completion.wait()?);
        Ok((reported - target).abs().0 <= self.inner.config.one_step_deg().0)
    }

    /// 转动到绝对角度，不等完成（moveL 流式重定目标用）
    ///
    /// 完成回报仍会经由网关钩子更新 `last_known_angle`。
    pub fn rotate_to_nowait(&self, target: Deg) -> Result<()> {
        let state = self.state();
        if !state.is_homing {
            self.require_homed(&state)?;
            self.require_in_range(target)?;
        }
        self.issue_step_to(target)?;
        Ok(())
    }

    fn issue_step_to(&self, target: Deg) -> Result<hexarm_gateway::Completion> {
        let config = &self.inner.config;
        let steps = config.steps_from_deg(target.0).round() as i32;
        Ok(self.inner.gateway.step_to(config.device, steps)?)
    }

    /// 停止流程
    ///
    /// stop → 保存加速度 → 清零 → 零步栅栏 → 恢复加速度。
    /// 被打断的在途运动的完成句柄由栅栏回报代为解决。
    pub fn stop(&self) -> Result<()> {
        stop_inner(&self.inner)
    }

    /// 查询当前角度（往返一次位置查询）
    pub fn report_angle(&self) -> Result<Deg> {
        let config = &self.inner.config;
        let completion = self.inner.gateway.report_position(config.device)?;
        Ok(config.deg_from_steps(completion.wait()?))
    }

    /// 去备战位
    pub fn go_to_ready(&self) -> Result<bool> {
        self.rotate_to(self.inner.config.ready_position)
    }

    /// 回零状态机
    ///
    /// `PreCheck → SeekLimit → Settle → Calibrated`，失败进
    /// `Failed`（`homed` 保持 false）。成功后关节停在备战位，
    /// 微控制器计数器在机械零位清零。
    pub fn home(&self) -> Result<()> {
        let joint = self.name();
        info!(%joint, "homing start");
        self.inner.state.rcu(|state| JointState {
            is_homing: true,
            homed: false,
            ..**state
        });
        let result = self.run_homing(0);
        self.inner.state.rcu(|state| JointState {
            is_homing: false,
            ..**state
        });
        match &result {
            Ok(()) => info!(%joint, "homing complete"),
            Err(e) => warn!(%joint, "homing failed: {}", e),
        }
        result
    }

    fn run_homing(&self, backoff_attempts: u8) -> Result<()> {
        let config = &self.inner.config;
        let joint = config.name;

        // PreCheck：开机压在开关上，先退出来再找
        if self.state().home_switch_active {
            if backoff_attempts >= PRECHECK_BACKOFF_LIMIT {
                return Err(ArmError::HomingFailed {
                    joint,
                    reason: "switch stuck active after back-off",
                });
            }
            debug!(%joint, "switch active at start, backing off");
            let back_off = Deg(PRECHECK_BACKOFF.0 * -config.homing_direction.sign());
            self.rotate_by(back_off)?;
            return self.run_homing(backoff_attempts + 1);
        }

        // SeekLimit：恒速朝开关方向扫完整个行程
        self.set_speed(config.homing_speed)?;
        self.set_acceleration(0.0)?;
        let travel = config.homing_travel();
        debug!(%joint, %travel, "seeking limit switch");
        let steps = config.steps_from_deg(travel.0).round() as i32;
        let seek = self.inner.gateway.step_relative(config.device, steps)?;
        // 自然走完，或被开关事件的 stop()+栅栏打断后由回报排空
        seek.wait()?;
        // 栅栏回报先于 stop 流程的加速度恢复到达；拿一次 stop 锁，
        // 确保事件线程的恢复写完再覆盖动力学参数
        drop(self.inner.stop_lock.lock());

        self.set_speed(config.max_speed)?;
        self.set_acceleration(config.max_accel)?;

        if !self.state().home_switch_active {
            return Err(ArmError::HomingFailed {
                joint,
                reason: "travel exceeded, switch not hit",
            });
        }

        // Settle：去抖 + 机械稳定
        std::thread::sleep(SETTLE);

        // Calibrated：标定补偿 → 计数器清零 → 去备战位
        self.rotate_by(config.homing_offset())?;
        self.inner.gateway.zero(config.device)?;
        self.inner.state.rcu(|state| JointState {
            homed: true,
            last_known_angle: Deg::ZERO,
            ..**state
        });
        debug!(%joint, "calibrated, counter zeroed");
        self.rotate_to(config.ready_position)?;
        Ok(())
    }

    fn require_homed(&self, state: &JointState) -> Result<()> {
        if state.homed {
            Ok(())
        } else {
            Err(ArmError::NotHomed { joint: self.name() })
        }
    }

    fn require_in_range(&self, target: Deg) -> Result<()> {
        let config = &self.inner.config;
        if config.range.contains(target) {
            Ok(())
        } else {
            Err(ArmError::OutOfRange {
                joint: config.name,
                target,
                range: config.range,
            })
        }
    }
}

/// stop 流程本体（开关监听线程也要调用，不经过公开句柄）
fn stop_inner(inner: &JointInner) -> Result<()> {
    let _guard = inner.stop_lock.lock();
    let device = inner.config.device;
    inner.gateway.stop(device)?;

    let saved_accel = inner.state.load().current_accel;
    inner.gateway.set_acceleration(device, 0.0)?;
    inner.state.rcu(|state| JointState {
        current_accel: 0.0,
        ..**state
    });

    // 栅栏：排空被打断运动的完成队列
    let fence = inner.gateway.step_relative(device, 0)?;
    fence.wait()?;

    inner
        .gateway
        .set_acceleration(device, inner.config.steps_from_deg(saved_accel))?;
    inner.state.rcu(|state| JointState {
        current_accel: saved_accel,
        ..**state
    });
    Ok(())
}

/// 限位开关监听：压下 → 置位并停转；松开 → 清位
///
/// 这是硬件打断运动的唯一路径。通道关闭（发送端析构）时线程
/// 退出。
fn switch_loop(inner: Arc<JointInner>, events: Receiver<SwitchEvent>) {
    let joint = inner.config.name;
    for event in events {
        match event {
            SwitchEvent::Press => {
                debug!(%joint, "limit switch pressed");
                inner.state.rcu(|state| JointState {
                    home_switch_active: true,
                    ..**state
                });
                if let Err(e) = stop_inner(&inner) {
                    warn!(%joint, "stop on switch press failed: {}", e);
                }
            },
            SwitchEvent::Release => {
                debug!(%joint, "limit switch released");
                inner.state.rcu(|state| JointState {
                    home_switch_active: false,
                    ..**state
                });
            },
        }
    }
}
