//! 微控制器 → 主机回复帧解析
//!
//! AccelStepper 只有两种回复：运动完成（`0x0A`）和位置查询回复
//! （`0x06`），载荷都是设备号 + 5 字节绝对步数。

use crate::codec::decode_i32;
use crate::ids::*;
use crate::{DeviceIndex, ProtocolError};

/// 回复类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// 运动完成（一次排空的运动队列只回报一次）
    MoveComplete,
    /// 位置查询回复
    Position,
}

/// 解析后的回复
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reply {
    pub device: DeviceIndex,
    pub kind: ReplyKind,
    /// 微控制器侧的绝对步数计数
    pub position: i32,
}

impl Reply {
    /// 从 sysex 载荷解析回复
    ///
    /// `payload` 是剥掉 `0xF0 0x62` 前缀和 `0xF7` 结尾后的字节串，
    /// 即 `<子命令> <设备> <位置×5>`。
    pub fn parse(payload: &[u8]) -> Result<Reply, ProtocolError> {
        let (&subcommand, rest) = payload.split_first().ok_or(ProtocolError::UnexpectedEnd {
            needed: 7,
        })?;
        let kind = match subcommand {
            STEPPER_MOVE_COMPLETE => ReplyKind::MoveComplete,
            STEPPER_REPORT_POSITION => ReplyKind::Position,
            other => return Err(ProtocolError::InvalidSubcommand { subcommand: other }),
        };
        let (&device, rest) = rest.split_first().ok_or(ProtocolError::UnexpectedEnd {
            needed: 6,
        })?;
        let device = DeviceIndex::new(device)?;
        let position = decode_i32(rest)?;
        Ok(Reply {
            device,
            kind,
            position,
        })
    }
}

/// 从字节流里切出 sysex 帧的增量解析器
///
/// 传输层给出的字节不保证按帧边界到达；本解析器累积字节，
/// 每遇到 `0xF7` 产出一帧 AccelStepper 载荷。非 AccelStepper
/// 的 sysex 帧（其他 Firmata 特性）被静默丢弃。
#[derive(Debug, Default)]
pub struct SysexScanner {
    buffer: Vec<u8>,
    in_frame: bool,
}

impl SysexScanner {
    pub fn new() -> Self {
        SysexScanner::default()
    }

    /// 喂入一段字节，返回其中完整的 AccelStepper 回复
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<Reply, ProtocolError>> {
        let mut replies = Vec::new();
        for &b in bytes {
            match b {
                START_SYSEX => {
                    self.buffer.clear();
                    self.in_frame = true;
                },
                END_SYSEX if self.in_frame => {
                    self.in_frame = false;
                    if let Some((&feature, payload)) = self.buffer.split_first() {
                        if feature == ACCELSTEPPER_DATA {
                            replies.push(Reply::parse(payload));
                        }
                    }
                    self.buffer.clear();
                },
                data if self.in_frame => self.buffer.push(data),
                // 帧外字节（模拟量回报等非 sysex 流量）直接忽略
                _ => {},
            }
        }
        replies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_i32;

    fn complete_frame(device: u8, position: i32) -> Vec<u8> {
        let mut f = vec![START_SYSEX, ACCELSTEPPER_DATA, STEPPER_MOVE_COMPLETE, device];
        f.extend_from_slice(&encode_i32(position));
        f.push(END_SYSEX);
        f
    }

    #[test]
    fn test_parse_move_complete() {
        let mut payload = vec![STEPPER_MOVE_COMPLETE, 4];
        payload.extend_from_slice(&encode_i32(-3200));
        let reply = Reply::parse(&payload).unwrap();
        assert_eq!(reply.kind, ReplyKind::MoveComplete);
        assert_eq!(reply.device.value(), 4);
        assert_eq!(reply.position, -3200);
    }

    #[test]
    fn test_parse_position_report() {
        let mut payload = vec![STEPPER_REPORT_POSITION, 0];
        payload.extend_from_slice(&encode_i32(12_345));
        let reply = Reply::parse(&payload).unwrap();
        assert_eq!(reply.kind, ReplyKind::Position);
        assert_eq!(reply.position, 12_345);
    }

    #[test]
    fn test_parse_unknown_subcommand() {
        assert!(matches!(
            Reply::parse(&[0x33, 0, 0, 0, 0, 0, 0]),
            Err(ProtocolError::InvalidSubcommand { subcommand: 0x33 })
        ));
    }

    #[test]
    fn test_parse_truncated() {
        let payload = vec![STEPPER_MOVE_COMPLETE, 2, 1, 2];
        assert!(matches!(
            Reply::parse(&payload),
            Err(ProtocolError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn test_scanner_single_frame() {
        let mut scanner = SysexScanner::new();
        let replies = scanner.push(&complete_frame(1, 640));
        assert_eq!(replies.len(), 1);
        let reply = replies[0].as_ref().unwrap();
        assert_eq!(reply.device.value(), 1);
        assert_eq!(reply.position, 640);
    }

    #[test]
    fn test_scanner_split_across_reads() {
        let frame = complete_frame(3, -77);
        let mut scanner = SysexScanner::new();
        assert!(scanner.push(&frame[..4]).is_empty());
        let replies = scanner.push(&frame[4..]);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].as_ref().unwrap().position, -77);
    }

    #[test]
    fn test_scanner_ignores_foreign_sysex() {
        // 其他 Firmata 特性（比如 0x6A report firmware）不产出回复
        let mut scanner = SysexScanner::new();
        let replies = scanner.push(&[START_SYSEX, 0x6A, 1, 2, 3, END_SYSEX]);
        assert!(replies.is_empty());
    }

    #[test]
    fn test_scanner_back_to_back_frames() {
        let mut bytes = complete_frame(0, 1);
        bytes.extend_from_slice(&complete_frame(5, 2));
        let mut scanner = SysexScanner::new();
        let replies = scanner.push(&bytes);
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[1].as_ref().unwrap().device.value(), 5);
    }
}
