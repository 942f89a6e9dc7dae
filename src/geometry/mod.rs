mod path;

pub use path::{
    calculate_bounds, circle_path, ellipse_outline, points_along, polyline_length, polyline_path, quad_path,
    rect_path,
};
