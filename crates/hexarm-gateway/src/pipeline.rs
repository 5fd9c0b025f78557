//! IO 线程循环
//!
//! 网关唯一接触传输层的地方。单线程顺序处理"发命令 → 收回报"，
//! 完成槽的注册永远发生在命令写出之前，天然避开注册/回报竞态。

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use hexarm_protocol::{Command, Reply, ReplyKind, SysexScanner, MAX_DEVICES};
use smallvec::SmallVec;
use tracing::{error, trace, warn};

use crate::error::{GatewayError, GatewayEvent, Result};
use crate::gateway::Shared;
use crate::transport::Transport;

/// 接收超时：收不到数据就回头检查命令队列
const RECV_TIMEOUT: Duration = Duration::from_millis(2);

/// 发往 IO 线程的请求
pub(crate) enum Request {
    Wire {
        command: Command,
        completion: Option<Sender<Result<i32>>>,
    },
    Shutdown,
}

/// 每设备的挂起完成槽
///
/// 运动槽与位置查询槽分开路由：`MOVE_COMPLETE` 一次排空该设备
/// 的全部运动槽（stop 打断的运动由后续零步栅栏的回报代为解决），
/// 位置回报则严格按 FIFO 一对一出队。
#[derive(Default)]
struct PendingSlots {
    motions: [SmallVec<[Sender<Result<i32>>; 2]>; MAX_DEVICES as usize],
    positions: [SmallVec<[Sender<Result<i32>>; 2]>; MAX_DEVICES as usize],
}

impl PendingSlots {
    fn register(&mut self, command: &Command, tx: Sender<Result<i32>>) {
        let device = command.device().index();
        match command {
            Command::StepRelative { .. } | Command::StepTo { .. } => {
                self.motions[device].push(tx);
            },
            Command::ReportPosition { .. } => {
                self.positions[device].push(tx);
            },
            // 即发即弃命令不携带完成槽
            _ => {},
        }
    }

    fn resolve(&mut self, reply: Reply) {
        let device = reply.device.index();
        match reply.kind {
            ReplyKind::MoveComplete => {
                if self.motions[device].is_empty() {
                    trace!(device = device, "move complete with no waiter (fire-and-forget)");
                }
                for tx in self.motions[device].drain(..) {
                    // 等待方可能已丢弃句柄（moveL 的流式重定目标）
                    let _ = tx.send(Ok(reply.position));
                }
            },
            ReplyKind::Position => {
                if self.positions[device].is_empty() {
                    warn!(device = device, "unsolicited position report");
                } else {
                    let tx = self.positions[device].remove(0);
                    let _ = tx.send(Ok(reply.position));
                }
            },
        }
    }

    /// 以终态错误排空所有挂起槽
    fn fail_all(&mut self) {
        for device in 0..MAX_DEVICES as usize {
            for tx in self.motions[device].drain(..) {
                let _ = tx.send(Err(GatewayError::Down));
            }
            for tx in self.positions[device].drain(..) {
                let _ = tx.send(Err(GatewayError::Down));
            }
        }
    }
}

/// IO 线程主循环
pub(crate) fn io_loop(
    mut transport: Box<dyn Transport>,
    cmd_rx: Receiver<Request>,
    shared: Arc<Shared>,
) {
    let mut scanner = SysexScanner::new();
    let mut pending = PendingSlots::default();

    loop {
        // 1. 排空命令队列
        loop {
            match cmd_rx.try_recv() {
                Ok(Request::Wire {
                    command,
                    completion,
                }) => {
                    if let Some(tx) = completion {
                        pending.register(&command, tx);
                    }
                    trace!(?command, "tx");
                    if let Err(e) = transport.send(&command.encode()) {
                        error!("transport write failed: {}", e);
                        go_down(&mut pending, &shared);
                        return;
                    }
                },
                Ok(Request::Shutdown) | Err(TryRecvError::Disconnected) => {
                    // 网关被析构：挂起的等待方不能悬死
                    go_down(&mut pending, &shared);
                    return;
                },
                Err(TryRecvError::Empty) => break,
            }
        }

        // 2. 接收回报
        match transport.recv_timeout(RECV_TIMEOUT) {
            Ok(Some(bytes)) => {
                for parsed in scanner.push(&bytes) {
                    match parsed {
                        Ok(reply) => {
                            if let Some(hook) = &shared.hooks.lock()[reply.device.index()] {
                                hook(reply.kind, reply.position);
                            }
                            pending.resolve(reply);
                        },
                        Err(e) => warn!("malformed reply dropped: {}", e),
                    }
                }
            },
            Ok(None) => {},
            Err(e) => {
                error!("transport read failed: {}", e);
                go_down(&mut pending, &shared);
                return;
            },
        }
    }
}

/// 进入终态：排空挂起槽、竖下线旗、广播事件
fn go_down(pending: &mut PendingSlots, shared: &Shared) {
    pending.fail_all();
    shared.down.store(true, Ordering::SeqCst);
    for tx in shared.subscribers.lock().iter() {
        let _ = tx.send(GatewayEvent::Down);
    }
}
