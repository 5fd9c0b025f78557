//! 关节索引和关节数组
//!
//! 六关节臂的编译期安全索引：用枚举杜绝越界，`JointArray` 提供
//! 按关节索引、迭代和映射操作。
//!
//! # 示例
//!
//! ```rust
//! use hexarm_kinematics::{Deg, Joint, JointArray};
//!
//! let angles = JointArray::new([
//!     Deg(0.0), Deg(10.0), Deg(3.0),
//!     Deg(5.0), Deg(90.0), Deg(1.0),
//! ]);
//!
//! assert_eq!(angles[Joint::J5], Deg(90.0));
//!
//! let rad = angles.map(|a| a.to_rad());
//! assert!((rad[Joint::J2].0 - 10f64.to_radians()).abs() < 1e-12);
//! ```

use std::fmt;
use std::ops::{Index, IndexMut};

/// 关节枚举（J1 基座 → J6 末端）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Joint {
    /// 关节 1（基座旋转）
    J1 = 0,
    /// 关节 2（肩部俯仰）
    J2 = 1,
    /// 关节 3（肘部俯仰）
    J3 = 2,
    /// 关节 4（腕部旋转）
    J4 = 3,
    /// 关节 5（腕部俯仰）
    J5 = 4,
    /// 关节 6（末端旋转）
    J6 = 5,
}

impl Joint {
    /// 所有关节，按基座到末端排序
    pub const ALL: [Joint; 6] = [
        Joint::J1,
        Joint::J2,
        Joint::J3,
        Joint::J4,
        Joint::J5,
        Joint::J6,
    ];

    /// 获取关节索引（0-5）
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// 从索引创建关节（范围检查）
    pub fn from_index(index: usize) -> Option<Self> {
        Joint::ALL.get(index).copied()
    }

    /// 关节名称
    pub const fn name(self) -> &'static str {
        match self {
            Joint::J1 => "J1",
            Joint::J2 => "J2",
            Joint::J3 => "J3",
            Joint::J4 => "J4",
            Joint::J5 => "J5",
            Joint::J6 => "J6",
        }
    }

    /// 是否属于腕关节（J4-J6，球腕）
    #[inline]
    pub const fn is_wrist(self) -> bool {
        self.index() >= 3
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 六元关节数组
///
/// 所有按关节展开的量（角度、速度、范围、控制器句柄）都装进
/// 这个容器，避免裸 `[T; 6]` 在下标上出错。
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointArray<T> {
    data: [T; 6],
}

impl<T: Copy> Copy for JointArray<T> {}

impl<T> JointArray<T> {
    /// 创建关节数组
    #[inline]
    pub const fn new(data: [T; 6]) -> Self {
        JointArray { data }
    }

    /// 内部数组引用
    #[inline]
    pub fn as_array(&self) -> &[T; 6] {
        &self.data
    }

    /// 消耗 self 取出内部数组
    #[inline]
    pub fn into_array(self) -> [T; 6] {
        self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// 映射转换
    pub fn map<U, F>(self, f: F) -> JointArray<U>
    where
        F: FnMut(T) -> U,
    {
        JointArray::new(self.data.map(f))
    }

    /// 带关节号的映射转换
    pub fn map_with_joint<U, F>(self, mut f: F) -> JointArray<U>
    where
        F: FnMut(Joint, T) -> U,
    {
        let [a1, a2, a3, a4, a5, a6] = self.data;
        JointArray::new([
            f(Joint::J1, a1),
            f(Joint::J2, a2),
            f(Joint::J3, a3),
            f(Joint::J4, a4),
            f(Joint::J5, a5),
            f(Joint::J6, a6),
        ])
    }

    /// 与另一个数组逐关节配对
    pub fn zip<U>(self, other: JointArray<U>) -> JointArray<(T, U)> {
        let [a1, a2, a3, a4, a5, a6] = self.data;
        let [b1, b2, b3, b4, b5, b6] = other.data;
        JointArray::new([(a1, b1), (a2, b2), (a3, b3), (a4, b4), (a5, b5), (a6, b6)])
    }

    /// 可失败的映射：任意一个关节失败则整体失败
    pub fn try_map<U, E, F>(self, mut f: F) -> Result<JointArray<U>, E>
    where
        F: FnMut(Joint, T) -> Result<U, E>,
    {
        let [a1, a2, a3, a4, a5, a6] = self.data;
        Ok(JointArray::new([
            f(Joint::J1, a1)?,
            f(Joint::J2, a2)?,
            f(Joint::J3, a3)?,
            f(Joint::J4, a4)?,
            f(Joint::J5, a5)?,
            f(Joint::J6, a6)?,
        ]))
    }
}

impl<T: Copy> JointArray<T> {
    /// 六个元素取同一个值
    #[inline]
    pub const fn splat(value: T) -> Self {
        JointArray::new([value; 6])
    }
}

impl<T> Index<Joint> for JointArray<T> {
    type Output = T;

    #[inline]
    fn index(&self, joint: Joint) -> &T {
        &self.data[joint.index()]
    }
}

impl<T> IndexMut<Joint> for JointArray<T> {
    #[inline]
    fn index_mut(&mut self, joint: Joint) -> &mut T {
        &mut self.data[joint.index()]
    }
}

impl<T> Index<usize> for JointArray<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

impl<T> IndexMut<usize> for JointArray<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.data[index]
    }
}

impl<T> From<[T; 6]> for JointArray<T> {
    #[inline]
    fn from(data: [T; 6]) -> Self {
        JointArray::new(data)
    }
}

impl<T> From<JointArray<T>> for [T; 6] {
    #[inline]
    fn from(arr: JointArray<T>) -> Self {
        arr.data
    }
}

impl<T> IntoIterator for JointArray<T> {
    type Item = T;
    type IntoIter = std::array::IntoIter<T, 6>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a JointArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Deg;

    #[test]
    fn test_joint_index() {
        assert_eq!(Joint::J1.index(), 0);
        assert_eq!(Joint::J6.index(), 5);
        assert_eq!(Joint::from_index(2), Some(Joint::J3));
        assert_eq!(Joint::from_index(6), None);
    }

    #[test]
    fn test_joint_wrist_split() {
        assert!(!Joint::J3.is_wrist());
        assert!(Joint::J4.is_wrist());
        assert_eq!(format!("{}", Joint::J4), "J4");
    }

    #[test]
    fn test_indexing() {
        let arr = JointArray::new([1, 2, 3, 4, 5, 6]);
        assert_eq!(arr[Joint::J1], 1);
        assert_eq!(arr[Joint::J6], 6);
        assert_eq!(arr[3], 4);
    }

    #[test]
    fn test_map_and_zip() {
        let a = JointArray::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = a.map(|v| v * 2.0);
        assert_eq!(b[Joint::J3], 6.0);

        let pairs = a.zip(b);
        assert_eq!(pairs[Joint::J6], (6.0, 12.0));
    }

    #[test]
    fn test_map_with_joint() {
        let arr = JointArray::splat(0usize).map_with_joint(|j, _| j.index());
        assert_eq!(arr.into_array(), [0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_try_map_propagates_error() {
        let arr = JointArray::new([Deg(0.0), Deg(0.0), Deg(200.0), Deg(0.0), Deg(0.0), Deg(0.0)]);
        let result: Result<JointArray<Deg>, Joint> =
            arr.try_map(|joint, a| if a.0 > 180.0 { Err(joint) } else { Ok(a) });
        assert_eq!(result.unwrap_err(), Joint::J3);
    }

    #[test]
    fn test_splat_and_into_iter() {
        let arr = JointArray::splat(Deg(7.0));
        assert!(arr.into_iter().all(|v| v == Deg(7.0)));
    }
}
