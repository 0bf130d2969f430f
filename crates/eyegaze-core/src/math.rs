//! Pose and quaternion math on the API's own vector types.
//!
//! Conventions: right-handed, -Z forward, Hamilton quaternions.
//! `multiply(a, b)` applies `a` first, then `b`.

use openxr_sys as xr;

pub const IDENTITY_ORIENTATION: xr::Quaternionf = xr::Quaternionf {
    x: 0.0,
    y: 0.0,
    z: 0.0,
    w: 1.0,
};

pub const ORIGIN: xr::Vector3f = xr::Vector3f {
    x: 0.0,
    y: 0.0,
    z: 0.0,
};

/// Direction the view looks at in its own space.
pub const FORWARD: xr::Vector3f = xr::Vector3f {
    x: 0.0,
    y: 0.0,
    z: -1.0,
};

#[must_use]
pub const fn identity() -> xr::Posef {
    xr::Posef {
        orientation: IDENTITY_ORIENTATION,
        position: ORIGIN,
    }
}

#[must_use]
pub const fn make_pose(orientation: xr::Quaternionf, position: xr::Vector3f) -> xr::Posef {
    xr::Posef {
        orientation,
        position,
    }
}

#[must_use]
pub fn vec3(x: f32, y: f32, z: f32) -> xr::Vector3f {
    xr::Vector3f { x, y, z }
}

fn add(a: xr::Vector3f, b: xr::Vector3f) -> xr::Vector3f {
    vec3(a.x + b.x, a.y + b.y, a.z + b.z)
}

fn scale(v: xr::Vector3f, s: f32) -> xr::Vector3f {
    vec3(v.x * s, v.y * s, v.z * s)
}

fn cross(a: xr::Vector3f, b: xr::Vector3f) -> xr::Vector3f {
    vec3(
        a.y * b.z - a.z * b.y,
        a.z * b.x - a.x * b.z,
        a.x * b.y - a.y * b.x,
    )
}

#[must_use]
pub fn length(v: xr::Vector3f) -> f32 {
    (v.x * v.x + v.y * v.y + v.z * v.z).sqrt()
}

/// Unit vector along `v`; the zero vector stays zero.
#[must_use]
pub fn normalize(v: xr::Vector3f) -> xr::Vector3f {
    let len = length(v);
    if len <= f32::EPSILON {
        ORIGIN
    } else {
        scale(v, 1.0 / len)
    }
}

/// Hamilton product: rotating by `a * b` applies `b` first.
#[must_use]
pub fn quat_mul(a: xr::Quaternionf, b: xr::Quaternionf) -> xr::Quaternionf {
    xr::Quaternionf {
        x: a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
        y: a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
        z: a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
        w: a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
    }
}

#[must_use]
pub fn conjugate(q: xr::Quaternionf) -> xr::Quaternionf {
    xr::Quaternionf {
        x: -q.x,
        y: -q.y,
        z: -q.z,
        w: q.w,
    }
}

fn quat_normalize(q: xr::Quaternionf) -> xr::Quaternionf {
    let len = (q.x * q.x + q.y * q.y + q.z * q.z + q.w * q.w).sqrt();
    if len <= f32::EPSILON {
        return IDENTITY_ORIENTATION;
    }
    xr::Quaternionf {
        x: q.x / len,
        y: q.y / len,
        z: q.z / len,
        w: q.w / len,
    }
}

/// Rotate `v` by the unit quaternion `q`.
#[must_use]
pub fn rotate(q: xr::Quaternionf, v: xr::Vector3f) -> xr::Vector3f {
    let u = vec3(q.x, q.y, q.z);
    let t = scale(cross(u, v), 2.0);
    add(add(v, scale(t, q.w)), cross(u, t))
}

fn axis_angle(axis: xr::Vector3f, angle: f32) -> xr::Quaternionf {
    let (s, c) = (angle * 0.5).sin_cos();
    xr::Quaternionf {
        x: axis.x * s,
        y: axis.y * s,
        z: axis.z * s,
        w: c,
    }
}

/// Rotation by `roll` about Z, then `pitch` about X, then `yaw` about Y.
#[must_use]
pub fn rotation_roll_pitch_yaw(pitch: f32, yaw: f32, roll: f32) -> xr::Quaternionf {
    let qx = axis_angle(vec3(1.0, 0.0, 0.0), pitch);
    let qy = axis_angle(vec3(0.0, 1.0, 0.0), yaw);
    let qz = axis_angle(vec3(0.0, 0.0, 1.0), roll);
    quat_mul(qy, quat_mul(qx, qz))
}

/// Pose applying `a` first, then `b`.
#[must_use]
pub fn multiply(a: xr::Posef, b: xr::Posef) -> xr::Posef {
    xr::Posef {
        orientation: quat_normalize(quat_mul(b.orientation, a.orientation)),
        position: add(rotate(b.orientation, a.position), b.position),
    }
}

#[must_use]
pub fn invert(p: xr::Posef) -> xr::Posef {
    let orientation = conjugate(p.orientation);
    xr::Posef {
        orientation,
        position: scale(rotate(orientation, p.position), -1.0),
    }
}

/// Map a point from the pose's local space into its parent space.
#[must_use]
pub fn transform_point(p: xr::Posef, point: xr::Vector3f) -> xr::Vector3f {
    add(rotate(p.orientation, point), p.position)
}

/// Spherical interpolation along the shortest arc.
#[must_use]
pub fn slerp(a: xr::Quaternionf, b: xr::Quaternionf, t: f32) -> xr::Quaternionf {
    let mut dot = a.x * b.x + a.y * b.y + a.z * b.z + a.w * b.w;
    let mut b = b;
    if dot < 0.0 {
        dot = -dot;
        b = xr::Quaternionf {
            x: -b.x,
            y: -b.y,
            z: -b.z,
            w: -b.w,
        };
    }
    let (wa, wb) = if dot > 0.9995 {
        (1.0 - t, t)
    } else {
        let theta = dot.acos();
        let sin = theta.sin();
        (((1.0 - t) * theta).sin() / sin, (t * theta).sin() / sin)
    };
    quat_normalize(xr::Quaternionf {
        x: wa * a.x + wb * b.x,
        y: wa * a.y + wb * b.y,
        z: wa * a.z + wb * b.z,
        w: wa * a.w + wb * b.w,
    })
}

/// Orientation slerp with linear position blend.
#[must_use]
pub fn slerp_pose(a: xr::Posef, b: xr::Posef, t: f32) -> xr::Posef {
    xr::Posef {
        orientation: slerp(a.orientation, b.orientation, t),
        position: add(scale(a.position, 1.0 - t), scale(b.position, t)),
    }
}

/// Both orientation and position are valid.
#[must_use]
pub fn is_pose_valid(flags: xr::SpaceLocationFlags) -> bool {
    flags.contains(xr::SpaceLocationFlags::ORIENTATION_VALID | xr::SpaceLocationFlags::POSITION_VALID)
}

/// All four valid/tracked bits.
#[must_use]
pub fn fully_tracked() -> xr::SpaceLocationFlags {
    xr::SpaceLocationFlags::ORIENTATION_VALID
        | xr::SpaceLocationFlags::ORIENTATION_TRACKED
        | xr::SpaceLocationFlags::POSITION_VALID
        | xr::SpaceLocationFlags::POSITION_TRACKED
}
