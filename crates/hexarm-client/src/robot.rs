//! 机器人协调器
//!
//! 独占持有六个关节控制器和运动学引擎，提供四个顶层操作：
//!
//! - [`Robot::home`]：先基座三关节、后腕部三关节的两阶段回零
//! - [`Robot::move_j`]：点到点关节运动（六关节并发）
//! - [`Robot::move_l`]：笛卡尔直线运动（50Hz 流式重定目标）
//! - [`Robot::halt`]：撤销调度器 + 全关节停转，幂等
//!
//! 当前位姿按需计算（`fk(last_known_angles)`），从不缓存。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use hexarm_gateway::Gateway;
use hexarm_kinematics::nalgebra::Matrix4;
use hexarm_kinematics::{Deg, DhChain, Joint, JointArray, Pose, WristConfig};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::ArmConfig;
use crate::error::{ArmError, Result};
use crate::joint::JointController;
use crate::switch::SwitchEvent;
use crate::trajectory::{CartesianTrajectory, CONTROL_FREQUENCY_HZ};

/// moveL 最短规划时长
const MIN_MOVE_DURATION_S: f64 = 0.5;

/// moveL 结束后的落停缓冲
const SETTLE_BUFFER: Duration = Duration::from_millis(500);

/// 机器人协调器
pub struct Robot {
    joints: JointArray<JointController>,
    chain: DhChain,
    config: ArmConfig,
    /// moveL 撤销旗标（halt 置位，每次 moveL 起步清零）
    halt_flag: AtomicBool,
    /// 同一时刻至多一条笛卡尔运动
    motion_lock: Mutex<()>,
}

impl Robot {
    /// 构造：按配置表建六个关节，逐台配置设备
    pub fn new(
        gateway: Arc<Gateway>,
        config: ArmConfig,
        switches: JointArray<Receiver<SwitchEvent>>,
    ) -> Result<Self> {
        let joints = config
            .joints()
            .clone()
            .zip(switches)
            .try_map(|_, (joint_config, events)| {
                JointController::new(joint_config, Arc::clone(&gateway), events)
            })?;
        Ok(Robot {
            joints,
            chain: DhChain::hexarm(),
            config,
            halt_flag: AtomicBool::new(false),
            motion_lock: Mutex::new(()),
        })
    }

    /// 单关节控制器
    pub fn joint(&self, joint: Joint) -> &JointController {
        &self.joints[joint]
    }

    /// 配置表
    pub fn config(&self) -> &ArmConfig {
        &self.config
    }

    /// 运动学引擎
    pub fn kinematics(&self) -> &DhChain {
        &self.chain
    }

    /// 替换工具坐标系
    pub fn set_tool_frame(&mut self, tool: Matrix4<f64>) {
        self.chain.set_tool_frame(tool);
    }

    /// 六关节当前角度（最近回报值）
    pub fn angles(&self) -> JointArray<Deg> {
        self.joints.clone().map(|joint| joint.last_known_angle())
    }

    /// 当前位姿：`fk(last_known_angles)`，按需计算不缓存
    pub fn pose(&self) -> Pose {
        self.chain.pose(&self.angles())
    }

    /// 两阶段回零：J1-J3 并发，完成后 J4-J6 并发
    ///
    /// 基座连杆寻位时腕部保持不动，避免末端甩动干扰。
    pub fn home(&self) -> Result<()> {
        info!("homing: base phase (J1-J3)");
        self.home_phase(&[Joint::J1, Joint::J2, Joint::J3])?;
        info!("homing: wrist phase (J4-J6)");
        self.home_phase(&[Joint::J4, Joint::J5, Joint::J6])
    }

    fn home_phase(&self, phase: &[Joint]) -> Result<()> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = phase
                .iter()
                .map(|&joint| (joint, scope.spawn(move || self.joints[joint].home())))
                .collect();
            let mut result = Ok(());
            for (joint, handle) in handles {
                let outcome = handle.join().unwrap_or(Err(ArmError::HomingFailed {
                    joint,
                    reason: "homing task panicked",
                }));
                if let Err(e) = outcome {
                    warn!(%joint, "homing phase error: {}", e);
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
            result
        })
    }

    /// 点到点关节运动：六关节并发 `rotate_to`，全部完成后返回
    ///
    /// 下发前整组校验，不会出现部分关节已动、部分报错的局面。
    pub fn move_j(&self, target: &JointArray<Deg>) -> Result<()> {
        for joint in Joint::ALL {
            let state = self.joints[joint].state();
            if !state.homed {
                return Err(ArmError::NotHomed { joint });
            }
            let range = self.config.joint(joint).range;
            if !range.contains(target[joint]) {
                return Err(ArmError::OutOfRange {
                    joint,
                    target: target[joint],
                    range,
                });
            }
        }
        std::thread::scope(|scope| {
            let handles: Vec<_> = Joint::ALL
                .iter()
                .map(|&joint| {
                    scope.spawn(move || self.joints[joint].rotate_to(target[joint]))
                })
                .collect();
            let mut result = Ok(());
            for handle in handles {
                match handle.join() {
                    Ok(Ok(_)) => {},
                    Ok(Err(e)) => {
                        if result.is_ok() {
                            result = Err(e);
                        }
                    },
                    Err(_) => {
                        if result.is_ok() {
                            result = Err(ArmError::Interrupted);
                        }
                    },
                }
            }
            result
        })
    }

    /// 笛卡尔直线运动
    ///
    /// 1. 起终点逆解（任一失败 → [`ArmError::IkFailed`]）
    /// 2. 时长 = max(各关节 |Δq|/max_speed, 0.5s)
    /// 3. 整条轨迹预先逆解验证（失败 → `TrajectoryInvalid`，不下发）
    /// 4. 50Hz 锚点节拍流式 `step_to` 重定目标，不等单点完成
    /// 5. 节拍结束后等待 `T + 500ms` 落停缓冲，再校准各关节角度
    ///
    /// 欧拉角分量线性插值、不回绕：跨 ±180° 接缝的姿态请拆成
    /// 多段。被 [`Robot::halt`] 打断返回 [`ArmError::Interrupted`]。
    pub fn move_l(&self, target: &Pose) -> Result<()> {
        let _motion = self.motion_lock.lock();
        self.halt_flag.store(false, Ordering::SeqCst);

        let ranges = self.config.ranges();
        let start = self.pose();
        let q_start = self.chain.inverse(&start, WristConfig::Flip, &ranges)?;
        let q_end = self.chain.inverse(target, WristConfig::Flip, &ranges)?;

        // 时间参数化：受限于最慢关节
        let mut required_s: f64 = 0.0;
        for joint in Joint::ALL {
            let delta = (q_end[joint] - q_start[joint]).abs().0;
            required_s = required_s.max(delta / self.config.joint(joint).max_speed);
        }
        let duration_s = required_s.max(MIN_MOVE_DURATION_S);
        let samples = (duration_s * CONTROL_FREQUENCY_HZ).ceil() as usize;

        let trajectory =
            CartesianTrajectory::plan(&self.chain, &start, target, samples, duration_s, &ranges)?;
        debug!(samples, duration_s, "moveL trajectory planned");

        // 锚点节拍：绝对时间推进，超时帧直接追赶
        let period = Duration::from_millis(trajectory.tick_ms());
        let mut next_tick = Instant::now();
        for (index, point) in trajectory.points().iter().enumerate() {
            if self.halt_flag.load(Ordering::SeqCst) {
                warn!(tick = index, "moveL cancelled by halt");
                return Err(ArmError::Interrupted);
            }
            for joint in Joint::ALL {
                self.joints[joint].rotate_to_nowait(point[joint])?;
            }
            next_tick += period;
            let now = Instant::now();
            if next_tick > now {
                spin_sleep::sleep(next_tick - now);
            } else {
                warn!(
                    tick = index,
                    late_us = (now - next_tick).as_micros() as u64,
                    "moveL tick overrun, catching up"
                );
                next_tick = now;
            }
        }

        // 落停缓冲：给微控制器把最后一段梯形走完的时间
        spin_sleep::sleep(Duration::from_secs_f64(duration_s) + SETTLE_BUFFER);
        if self.halt_flag.load(Ordering::SeqCst) {
            return Err(ArmError::Interrupted);
        }

        // 流式阶段的完成回报即发即弃，收尾用位置查询校准
        for joint in Joint::ALL {
            self.joints[joint].report_angle()?;
        }
        Ok(())
    }

    /// 急停：撤销 moveL 调度器，然后全关节并发 `stop()`
    ///
    /// 幂等；个别关节 stop 失败不阻止其余关节，完成后返回第一个
    /// 错误。
    pub fn halt(&self) -> Result<()> {
        info!("halt requested");
        self.halt_flag.store(true, Ordering::SeqCst);
        std::thread::scope(|scope| {
            let handles: Vec<_> = Joint::ALL
                .iter()
                .map(|&joint| (joint, scope.spawn(move || self.joints[joint].stop())))
                .collect();
            let mut result = Ok(());
            for (joint, handle) in handles {
                match handle.join() {
                    Ok(Ok(())) => {},
                    Ok(Err(e)) => {
                        warn!(%joint, "stop failed during halt: {}", e);
                        if result.is_ok() {
                            result = Err(e);
                        }
                    },
                    Err(_) => {
                        warn!(%joint, "stop task panicked during halt");
                        if result.is_ok() {
                            result = Err(ArmError::Interrupted);
                        }
                    },
                }
            }
            result
        })
    }
}
