mod avatar;
